//! Saving and restoring pose playback state
//!
//! Only the playback record is stored (clip names, start ticks, body states,
//! combo stage and the names of the bound rotation / item clips). Bone
//! matrices are recomputed by the next update.
//!
//! Binary layout, little-endian:
//!
//! ```text
//! u32 layer count
//! per layer: string clip name, u64 start tick, u32 body state bits
//! u16 combo length
//! string rotation clip name (empty if none)
//! string item-use clip name (empty if none)
//! ```
//!
//! Strings are a `u32` byte length followed by UTF-8 bytes.

use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use log::debug;
use serde::{Deserialize, Serialize};

use super::{BodyState, Pose};
use crate::error::{AnimError, Result};
use crate::solver::AnimationSolver;

const MAX_LAYERS: u32 = 1024;
const MAX_NAME_LEN: u32 = 4096;

/// Saved record of one layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerState {
    pub sequence: String,
    pub start: u64,
    pub body_state: u32,
}

/// Saved playback record of a pose
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoseState {
    pub layers: Vec<LayerState>,
    pub combo_len: u16,
    pub rotation: String,
    pub item_use: String,
}

impl PoseState {
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        let count = u32::try_from(self.layers.len())
            .map_err(|_| AnimError::Corrupt("too many layers".into()))?;
        writer.write_u32::<LittleEndian>(count)?;
        for layer in &self.layers {
            write_string(writer, &layer.sequence)?;
            writer.write_u64::<LittleEndian>(layer.start)?;
            writer.write_u32::<LittleEndian>(layer.body_state)?;
        }
        writer.write_u16::<LittleEndian>(self.combo_len)?;
        write_string(writer, &self.rotation)?;
        write_string(writer, &self.item_use)?;
        Ok(())
    }

    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self> {
        let count = reader.read_u32::<LittleEndian>()?;
        if count > MAX_LAYERS {
            return Err(AnimError::Corrupt(format!("layer count {count}")));
        }

        let mut layers = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let sequence = read_string(reader)?;
            let start = reader.read_u64::<LittleEndian>()?;
            let body_state = reader.read_u32::<LittleEndian>()?;
            layers.push(LayerState {
                sequence,
                start,
                body_state,
            });
        }

        Ok(Self {
            layers,
            combo_len: reader.read_u16::<LittleEndian>()?,
            rotation: read_string(reader)?,
            item_use: read_string(reader)?,
        })
    }
}

fn write_string<W: Write>(writer: &mut W, value: &str) -> Result<()> {
    let len = u32::try_from(value.len())
        .ok()
        .filter(|&len| len <= MAX_NAME_LEN)
        .ok_or_else(|| AnimError::Corrupt(format!("name too long: {} bytes", value.len())))?;
    writer.write_u32::<LittleEndian>(len)?;
    writer.write_all(value.as_bytes())?;
    Ok(())
}

fn read_string<R: Read>(reader: &mut R) -> Result<String> {
    let len = reader.read_u32::<LittleEndian>()?;
    if len > MAX_NAME_LEN {
        return Err(AnimError::Corrupt(format!("name length {len}")));
    }
    let mut buf = vec![0u8; len as usize];
    reader.read_exact(&mut buf)?;
    String::from_utf8(buf).map_err(|e| AnimError::Corrupt(e.to_string()))
}

impl Pose {
    /// Current playback record
    pub fn snapshot_state(&self) -> PoseState {
        PoseState {
            layers: self
                .layers
                .iter()
                .map(|l| LayerState {
                    sequence: l.seq.name().to_string(),
                    start: l.start,
                    body_state: l.body_state.bits(),
                })
                .collect(),
            combo_len: self.combo_len,
            rotation: self
                .rotation_layer()
                .map(|l| l.seq.name().to_string())
                .unwrap_or_default(),
            item_use: self
                .item_use_layer()
                .map(|l| l.seq.name().to_string())
                .unwrap_or_default(),
        }
    }

    /// Replace the playback state with `state`
    ///
    /// Clips that no longer resolve through `solver` are dropped, as are
    /// rotation and item references to them.
    pub fn restore_state(&mut self, state: &PoseState, solver: &AnimationSolver) {
        self.stop_all();

        for saved in &state.layers {
            match solver.solve_frm(&saved.sequence) {
                Some(seq) => {
                    self.insert_layer(seq, BodyState::from_bits_truncate(saved.body_state), saved.start);
                }
                None => debug!("Dropping saved layer '{}': clip not found", saved.sequence),
            }
        }

        self.combo_len = state.combo_len;
        self.rotation = self.find_layer_id(&state.rotation);
        self.item_use = self.find_layer_id(&state.item_use);
    }

    fn find_layer_id(&self, name: &str) -> Option<u64> {
        if name.is_empty() {
            return None;
        }
        self.layers
            .iter()
            .find(|l| l.seq.name().eq_ignore_ascii_case(name))
            .map(|l| l.id)
    }

    pub fn save<W: Write>(&self, writer: &mut W) -> Result<()> {
        self.snapshot_state().write_to(writer)
    }

    pub fn load<R: Read>(&mut self, reader: &mut R, solver: &AnimationSolver) -> Result<()> {
        let state = PoseState::read_from(reader)?;
        self.restore_state(&state, solver);
        Ok(())
    }
}
