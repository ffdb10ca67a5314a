//! Binary save/load format: a 4-byte magic, a `u16` format version, a
//! `u64` payload length, then a `bincode`-encoded [`Snapshot`].
//!
//! The version is bumped whenever the snapshot layout changes in a way that
//! breaks decoding old files; `load` rejects any version it doesn't
//! recognize rather than guessing.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SbtError};
use crate::hash::HashFamily;
use crate::node::{IdGen, Node};
use crate::rng::SbtRng;
use crate::sbt::{Sbt, SbtConfig};

const MAGIC: &[u8; 4] = b"SBT1";
const VERSION: u16 = 1;

#[derive(Serialize, Deserialize)]
struct Snapshot {
    config: SbtConfig,
    root: Option<Box<Node>>,
    next_id: u64,
}

pub fn save(sbt: &Sbt, path: &Path) -> Result<()> {
    let snapshot = Snapshot {
        config: sbt.config.clone(),
        root: sbt.root.clone(),
        next_id: sbt.ids.peek(),
    };
    let payload = bincode::serialize(&snapshot)?;
    let mut file = BufWriter::new(File::create(path)?);
    file.write_all(MAGIC)?;
    file.write_all(&VERSION.to_le_bytes())?;
    file.write_all(&(payload.len() as u64).to_le_bytes())?;
    file.write_all(&payload)?;
    file.flush()?;
    Ok(())
}

pub fn load(path: &Path) -> Result<Sbt> {
    let mut file = BufReader::new(File::open(path)?);

    let mut magic = [0u8; 4];
    file.read_exact(&mut magic)?;
    if &magic != MAGIC {
        return Err(SbtError::InvalidConfiguration("not a sbt-index save file".into()));
    }

    let mut version_bytes = [0u8; 2];
    file.read_exact(&mut version_bytes)?;
    let version = u16::from_le_bytes(version_bytes);
    if version != VERSION {
        return Err(SbtError::InvalidConfiguration(format!(
            "unsupported save format version {version}, expected {VERSION}"
        )));
    }

    let mut len_bytes = [0u8; 8];
    file.read_exact(&mut len_bytes)?;
    let len = u64::from_le_bytes(len_bytes) as usize;
    let mut payload = vec![0u8; len];
    file.read_exact(&mut payload)?;

    let snapshot: Snapshot = bincode::deserialize(&payload)?;
    let hashes = HashFamily::new(snapshot.config.seed, snapshot.config.hash_functions);
    let rng = SbtRng::new(snapshot.config.seed);
    Ok(Sbt {
        config: snapshot.config,
        root: snapshot.root,
        hashes,
        ids: IdGen::resume_after(snapshot.next_id),
        rng,
    })
}
