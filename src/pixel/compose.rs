use rayon::prelude::*;

use crate::channels::ChannelId;
use crate::config::{CustomChannel, CustomSlot};
use crate::foundation::math::luminance;

enum SlotSource<'a> {
    Constant(f32),
    Map(&'a [f32], &'a CustomSlot),
}

impl SlotSource<'_> {
    fn sample(&self, px: usize) -> f32 {
        match self {
            Self::Constant(v) => *v,
            Self::Map(buf, slot) => {
                let p = &buf[px * 4..px * 4 + 4];
                let v = if slot.separate {
                    p[slot.component.index()]
                } else {
                    luminance([p[0], p[1], p[2], p[3]])
                };
                if slot.invert { 1.0 - v } else { v }
            }
        }
    }
}

fn resolve<'a, F>(slot: &'a CustomSlot, len: usize, lookup: &F) -> SlotSource<'a>
where
    F: Fn(ChannelId) -> Option<&'a [f32]>,
{
    if slot.use_map {
        if let Some(buf) = slot.source.and_then(lookup) {
            if buf.len() == len {
                return SlotSource::Map(buf, slot);
            }
            tracing::warn!(source = ?slot.source, "custom channel source size mismatch, using constant");
        }
    }
    let v = if slot.invert { 1.0 - slot.value } else { slot.value };
    SlotSource::Constant(v)
}

/// Assemble a custom channel's RGBA buffer of `len` floats from earlier
/// results looked up by channel id.
pub fn compose_custom<'a, F>(channel: &'a CustomChannel, len: usize, lookup: F) -> Vec<f32>
where
    F: Fn(ChannelId) -> Option<&'a [f32]>,
{
    let mut out = vec![0.0; len];
    if channel.bw {
        let src = resolve(&channel.bw_slot, len, &lookup);
        out.par_chunks_exact_mut(4).enumerate().for_each(|(i, px)| {
            let v = src.sample(i);
            px.copy_from_slice(&[v, v, v, 1.0]);
        });
    } else {
        let slots = channel.slots().map(|s| resolve(s, len, &lookup));
        out.par_chunks_exact_mut(4).enumerate().for_each(|(i, px)| {
            for (c, src) in slots.iter().enumerate() {
                px[c] = src.sample(i);
            }
        });
    }
    out
}

#[cfg(test)]
#[path = "../../tests/unit/pixel/compose.rs"]
mod tests;
