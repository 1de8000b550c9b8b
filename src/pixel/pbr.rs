use rayon::prelude::*;

use crate::channels::PbrMode;

const EPSILON: f32 = 1e-5;

/// Metalness estimate from a specular-workflow reflectance sample.
fn metalness(spec: &[f32], threshold: f32) -> f32 {
    let peak = spec[0].max(spec[1]).max(spec[2]);
    ((peak - threshold) / EPSILON.max(1.0 - threshold)).clamp(0.0, 1.0)
}

/// Derive a metal or base-colour map from specular (and diffuse) buffers.
///
/// Returns `false` without touching `target` when a required source is
/// missing or the buffer lengths disagree.
pub fn pbr_convert(
    target: &mut [f32],
    specular: &[f32],
    diffuse: Option<&[f32]>,
    mode: PbrMode,
    threshold: f32,
) -> bool {
    if specular.len() != target.len() || target.len() % 4 != 0 {
        tracing::warn!(
            target = target.len(),
            specular = specular.len(),
            "pbr conversion skipped: buffer size mismatch"
        );
        return false;
    }

    match mode {
        PbrMode::Metal => {
            target
                .par_chunks_exact_mut(4)
                .zip(specular.par_chunks_exact(4))
                .for_each(|(out, spec)| {
                    let m = metalness(spec, threshold);
                    out.copy_from_slice(&[m, m, m, 1.0]);
                });
            true
        }
        PbrMode::BaseColor => {
            let Some(diffuse) = diffuse.filter(|d| d.len() == target.len()) else {
                tracing::warn!("pbr base colour conversion needs a matching diffuse buffer");
                return false;
            };
            target
                .par_chunks_exact_mut(4)
                .zip(specular.par_chunks_exact(4))
                .zip(diffuse.par_chunks_exact(4))
                .for_each(|((out, spec), diff)| {
                    let m = metalness(spec, threshold);
                    for c in 0..3 {
                        out[c] = diff[c] * (1.0 - m) + spec[c] * m;
                    }
                    out[3] = diff[3];
                });
            true
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pixel/pbr.rs"]
mod tests;
