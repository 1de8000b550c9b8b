use rayon::prelude::*;

/// Outcome of a packing pass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PackReport {
    pub packed: Vec<usize>,
    pub warnings: Vec<String>,
}

impl PackReport {
    pub fn success(&self) -> bool {
        !self.packed.is_empty()
    }
}

/// Copy the red component of each source into its RGBA slot of `target`.
///
/// Unassigned slots become 0, except alpha which becomes 1. Sources whose
/// pixel count differs from the target are skipped with a warning.
pub fn pack_channels(target: &mut [f32], sources: &[(usize, &[f32])]) -> PackReport {
    let mut report = PackReport::default();

    target.par_chunks_exact_mut(4).for_each(|px| {
        px.copy_from_slice(&[0.0, 0.0, 0.0, 1.0]);
    });

    for &(slot, src) in sources {
        if slot > 3 {
            report
                .warnings
                .push(format!("pack slot {slot} is not an RGBA component"));
            continue;
        }
        if src.len() != target.len() {
            let msg = format!(
                "pack slot {slot} skipped: {} pixels, expected {}",
                src.len() / 4,
                target.len() / 4
            );
            tracing::warn!("{msg}");
            report.warnings.push(msg);
            continue;
        }
        target
            .par_chunks_exact_mut(4)
            .zip(src.par_chunks_exact(4))
            .for_each(|(out, s)| out[slot] = s[0]);
        report.packed.push(slot);
    }
    report
}

#[cfg(test)]
#[path = "../../tests/unit/pixel/pack.rs"]
mod tests;
