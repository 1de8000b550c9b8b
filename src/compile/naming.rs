use crate::config::{BakeMode, JobSetting, NameSetting};
use crate::foundation::math::clean_name;

/// Base name of a task's output images under `setting.name_setting`.
pub fn get_safe_base_name(
    setting: &JobSetting,
    object: &str,
    material: Option<&str>,
    is_batch: bool,
) -> String {
    name_for(
        setting.name_setting,
        &setting.custom_name,
        setting.bake_mode,
        object,
        material,
        is_batch,
    )
}

/// Output folder for a task, used when `create_new_folder` is set.
pub fn get_folder_name(
    setting: &JobSetting,
    object: &str,
    material: Option<&str>,
    is_batch: bool,
) -> String {
    match setting.new_folder_name_setting {
        NameSetting::Custom if !setting.folder_name.is_empty() => clean_name(&setting.folder_name),
        policy => name_for(
            policy,
            &setting.folder_name,
            setting.bake_mode,
            object,
            material,
            is_batch,
        ),
    }
}

fn name_for(
    policy: NameSetting,
    custom: &str,
    mode: BakeMode,
    object: &str,
    material: Option<&str>,
    is_batch: bool,
) -> String {
    let mat = material.unwrap_or("NoMat");
    let base = match policy {
        NameSetting::Custom => {
            let mut base = if custom.is_empty() {
                String::from("Bake")
            } else {
                custom.to_string()
            };
            if is_batch {
                base.push('_');
                base.push_str(object);
                if mode == BakeMode::SplitMaterial
                    && let Some(m) = material
                {
                    base.push('_');
                    base.push_str(m);
                }
            }
            base
        }
        NameSetting::Object => object.to_string(),
        NameSetting::Mat if is_batch && mode == BakeMode::SplitMaterial => {
            format!("{object}_{mat}")
        }
        NameSetting::Mat => mat.to_string(),
        NameSetting::ObjMat => format!("{object}_{mat}"),
    };
    clean_name(&base)
}

#[cfg(test)]
#[path = "../../tests/unit/compile/naming.rs"]
mod tests;
