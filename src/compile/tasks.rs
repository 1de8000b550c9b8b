use crate::compile::naming::{get_folder_name, get_safe_base_name};
use crate::config::{BakeMode, JobSetting, NameSetting};
use crate::scene::{MaterialId, ObjectId, Scene};

/// One independent bake unit producing one texture set.
#[derive(Clone, Debug, PartialEq)]
pub struct BakeTask {
    pub objects: Vec<ObjectId>,
    pub materials: Vec<MaterialId>,
    pub active: ObjectId,
    pub base_name: String,
    pub folder_name: String,
}

/// Group `objects` into tasks according to the bake mode.
pub fn build_tasks(
    scene: &Scene,
    setting: &JobSetting,
    objects: &[ObjectId],
    active: Option<ObjectId>,
) -> Vec<BakeTask> {
    let object_name = |id: ObjectId| scene.object_name(id);
    let material_name = |id: Option<MaterialId>| -> Option<String> {
        id.and_then(|m| scene.material(m)).map(|m| m.name.clone())
    };
    let materials_of = |id: ObjectId| -> Vec<MaterialId> {
        scene.object(id).map(|o| o.materials()).unwrap_or_default()
    };
    let names = |obj: ObjectId, mat: Option<MaterialId>, is_batch: bool| -> (String, String) {
        let obj_name = object_name(obj);
        let mat_name = material_name(mat);
        (
            get_safe_base_name(setting, &obj_name, mat_name.as_deref(), is_batch),
            get_folder_name(setting, &obj_name, mat_name.as_deref(), is_batch),
        )
    };

    let mut tasks = Vec::new();
    match setting.bake_mode {
        BakeMode::SingleObject => {
            let is_batch = objects.len() > 1;
            for &obj in objects {
                let materials = materials_of(obj);
                let (base_name, folder_name) = names(obj, materials.first().copied(), is_batch);
                tasks.push(BakeTask {
                    objects: vec![obj],
                    materials,
                    active: obj,
                    base_name,
                    folder_name,
                });
            }
        }
        BakeMode::CombineObject | BakeMode::Udim => {
            let Some(target) = active.or_else(|| objects.first().copied()) else {
                return tasks;
            };
            let primary = scene.object(target).and_then(|o| o.primary_material());
            let (mut base_name, folder_name) = names(target, primary, false);
            if setting.bake_mode == BakeMode::Udim && setting.name_setting != NameSetting::Custom {
                base_name = String::from("UDIM_Bake");
            }
            tasks.push(BakeTask {
                objects: objects.to_vec(),
                materials: union_materials(objects.iter().map(|&o| materials_of(o))),
                active: target,
                base_name,
                folder_name,
            });
        }
        BakeMode::SelectActive => {
            let Some(target) = active else {
                return tasks;
            };
            let primary = scene.object(target).and_then(|o| o.primary_material());
            let (base_name, folder_name) = names(target, primary, false);
            let materials = union_materials(
                objects
                    .iter()
                    .chain(std::iter::once(&target))
                    .map(|&o| materials_of(o)),
            );
            tasks.push(BakeTask {
                objects: objects.to_vec(),
                materials,
                active: target,
                base_name,
                folder_name,
            });
        }
        BakeMode::SplitMaterial => {
            for &obj in objects {
                for mat in materials_of(obj) {
                    let (base_name, folder_name) = names(obj, Some(mat), true);
                    tasks.push(BakeTask {
                        objects: vec![obj],
                        materials: vec![mat],
                        active: obj,
                        base_name,
                        folder_name,
                    });
                }
            }
        }
    }
    tasks
}

/// Union of material lists in first-seen order.
fn union_materials(lists: impl Iterator<Item = Vec<MaterialId>>) -> Vec<MaterialId> {
    let mut out: Vec<MaterialId> = Vec::new();
    for mat in lists.flatten() {
        if !out.contains(&mat) {
            out.push(mat);
        }
    }
    out
}

#[cfg(test)]
#[path = "../../tests/unit/compile/tasks.rs"]
mod tests;
