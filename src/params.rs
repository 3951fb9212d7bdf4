//! Parameter file loading: Bradley-Terry/factorization-machine weights for
//! every feature family, read once at startup from `<workdir>/uct_params/`
//! and `<workdir>/sim_params/`.
//!
//! Grounded in `src/mcts/UctRating.cpp`'s `InputBTFMParameter`/`InputPat3`/
//! `InputMD2`/`InputLargePattern`: each line is whitespace-separated
//! `fscanf`-style tokens, not a rigid delimiter, so the reader here just
//! tokenizes on any whitespace. Fixed-size tables (`CaptureFeature.txt`,
//! `Pat3.txt`, ...) read exactly N records; sparse tables (`MD2.txt`,
//! `MD3/4/5.txt`) read until EOF, keyed by the leading index/hash column.
//! A missing or short file is a fatal startup error (§7's exit code 1),
//! never a silent default.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// `BTFM_DIMENSION` in the original (`include/mcts/UctRating.hpp`): the
/// latent-vector width shared by every second-order feature pair.
pub const FM_DIMENSION: usize = 5;

pub const PASS_MAX: usize = 2;
pub const POS_ID_MAX: usize = 64;
pub const MOVE_DISTANCE_MAX: usize = 16;

#[derive(Debug, Error)]
pub enum ParamLoadError {
    #[error("cannot open parameter file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parameter file {path:?} ended after {records} records, expected {expected}")]
    Truncated {
        path: PathBuf,
        records: usize,
        expected: usize,
    },
    #[error("parameter file {path:?} has a malformed numeric token: {token:?}")]
    BadToken { path: PathBuf, token: String },
}

/// First-order weight `w` plus a `FM_DIMENSION`-wide second-order latent
/// vector `v` (`fm_t` in the original).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FmParam {
    pub w: f64,
    pub v: [f64; FM_DIMENSION],
}

impl Default for FmParam {
    fn default() -> Self {
        FmParam { w: 0.0, v: [0.0; FM_DIMENSION] }
    }
}

/// A lazily-advancing whitespace tokenizer over a whole file's contents,
/// mirroring the original's repeated `fscanf("%le", ...)` calls.
struct Tokenizer {
    tokens: std::vec::IntoIter<String>,
}

impl Tokenizer {
    fn open(path: &Path) -> Result<Self, ParamLoadError> {
        let text = std::fs::read_to_string(path).map_err(|source| ParamLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let tokens: Vec<String> = text.split_whitespace().map(str::to_owned).collect();
        Ok(Tokenizer { tokens: tokens.into_iter() })
    }

    fn next_token(&mut self) -> Option<String> {
        self.tokens.next()
    }

    fn next_f64(&mut self, path: &Path) -> Result<Option<f64>, ParamLoadError> {
        match self.next_token() {
            None => Ok(None),
            Some(tok) => tok
                .parse::<f64>()
                .map(Some)
                .map_err(|_| ParamLoadError::BadToken { path: path.to_path_buf(), token: tok }),
        }
    }

    fn require_f64(&mut self, path: &Path) -> Result<f64, ParamLoadError> {
        self.next_f64(path)?.ok_or_else(|| ParamLoadError::Truncated {
            path: path.to_path_buf(),
            records: 0,
            expected: 1,
        })
    }

    fn next_i64(&mut self, path: &Path) -> Result<Option<i64>, ParamLoadError> {
        match self.next_token() {
            None => Ok(None),
            Some(tok) => tok
                .parse::<i64>()
                .map(Some)
                .map_err(|_| ParamLoadError::BadToken { path: path.to_path_buf(), token: tok }),
        }
    }
}

fn read_fm(tok: &mut Tokenizer, path: &Path) -> Result<FmParam, ParamLoadError> {
    let w = tok.require_f64(path)?;
    let mut v = [0.0; FM_DIMENSION];
    for slot in &mut v {
        *slot = tok.require_f64(path)?;
    }
    Ok(FmParam { w, v })
}

/// Read exactly `n` fixed-width `w v1..vD` records (`InputBTFMParameter`).
fn read_fixed(path: &Path, n: usize) -> Result<Vec<FmParam>, ParamLoadError> {
    let mut tok = Tokenizer::open(path)?;
    let mut out = Vec::with_capacity(n);
    for i in 0..n {
        let w = match tok.next_f64(path)? {
            Some(w) => w,
            None => {
                return Err(ParamLoadError::Truncated {
                    path: path.to_path_buf(),
                    records: i,
                    expected: n,
                })
            }
        };
        let mut v = [0.0; FM_DIMENSION];
        for slot in &mut v {
            *slot = tok.require_f64(path)?;
        }
        out.push(FmParam { w, v });
    }
    Ok(out)
}

/// Read the sparse `<code> <w> <v1..vD>` format used by `MD2.txt`
/// (`InputMD2`): one record per line until EOF, keyed directly by the
/// packed code (already canonical, already small enough to index by
/// value rather than by a separate hash column).
fn read_sparse_by_code(path: &Path) -> Result<HashMap<u32, FmParam>, ParamLoadError> {
    let mut tok = Tokenizer::open(path)?;
    let mut out = HashMap::new();
    loop {
        let Some(code) = tok.next_i64(path)? else { break };
        let param = read_fm(&mut tok, path)?;
        out.insert(code as u32, param);
    }
    Ok(out)
}

/// Read the sparse `<bucket> <hash> <w> <v1..vD>` format used by
/// `MD3/4/5.txt` (`InputLargePattern`). The original keys the runtime
/// table by `bucket` (an index into a fixed `HASH_MAX`-sized open-
/// addressed array) and stores `hash` inside each slot for probe-chain
/// verification; we collapse that two-level indirection into a single
/// `hash -> FmParam` map, since Rust's `HashMap` already gives us the
/// open-addressed lookup the original hand-rolled.
fn read_sparse_by_hash(path: &Path) -> Result<HashMap<u64, FmParam>, ParamLoadError> {
    let mut tok = Tokenizer::open(path)?;
    let mut out = HashMap::new();
    loop {
        let Some(_bucket) = tok.next_i64(path)? else { break };
        let hash = tok.require_f64(path)? as u64;
        let param = read_fm(&mut tok, path)?;
        out.insert(hash, param);
    }
    Ok(out)
}

/// Fixed-size `Pat3.txt`: `PAT3_MAX` records indexed directly by the raw
/// 3x3 code.
fn read_pat3(path: &Path) -> Result<Vec<FmParam>, ParamLoadError> {
    read_fixed(path, crate::patterns::PAT3_MAX)
}

/// Weights consumed by the tree-search move scorer (Component D), loaded
/// from `<workdir>/uct_params/`.
pub struct UctParams {
    pub pass: Vec<FmParam>,
    pub ko_exist: FmParam,
    pub capture: Vec<FmParam>,
    pub save_extension: Vec<FmParam>,
    pub atari: Vec<FmParam>,
    pub extension: Vec<FmParam>,
    pub dame: Vec<FmParam>,
    pub connect: Vec<FmParam>,
    pub throw_in: Vec<FmParam>,
    pub pos_id: Vec<FmParam>,
    pub move_distance: [Vec<FmParam>; 4],
    pub pat3: Vec<FmParam>,
    pub md2: HashMap<u32, FmParam>,
    pub md3: HashMap<u64, FmParam>,
    pub md4: HashMap<u64, FmParam>,
    pub md5: HashMap<u64, FmParam>,
}

impl UctParams {
    pub fn load(dir: &Path) -> Result<Self, ParamLoadError> {
        // Family sizes mirror the variant counts of features::{CaptureFeature,
        // ExtensionFeature, ThrowInFeature} (Atari/Dame/Connect/SaveExtension
        // each collapse to a present/absent flag in this engine).
        const CAPTURE_MAX: usize = 8;
        const SAVE_EXTENSION_MAX: usize = 2;
        const ATARI_MAX: usize = 2;
        const EXTENSION_MAX: usize = 4;
        const DAME_MAX: usize = 2;
        const CONNECT_MAX: usize = 2;
        const THROW_IN_MAX: usize = 2;

        let p = |name: &str| dir.join(name);
        Ok(UctParams {
            pass: read_fixed(&p("Pass.txt"), PASS_MAX)?,
            ko_exist: read_fixed(&p("KoExist.txt"), 1)?[0],
            capture: read_fixed(&p("CaptureFeature.txt"), CAPTURE_MAX)?,
            save_extension: read_fixed(&p("SaveExtensionFeature.txt"), SAVE_EXTENSION_MAX)?,
            atari: read_fixed(&p("AtariFeature.txt"), ATARI_MAX)?,
            extension: read_fixed(&p("ExtensionFeature.txt"), EXTENSION_MAX)?,
            dame: read_fixed(&p("DameFeature.txt"), DAME_MAX)?,
            connect: read_fixed(&p("ConnectionFeature.txt"), CONNECT_MAX)?,
            throw_in: read_fixed(&p("ThrowInFeature.txt"), THROW_IN_MAX)?,
            pos_id: read_fixed(&p("PosID.txt"), POS_ID_MAX)?,
            move_distance: [
                read_fixed(&p("MoveDistance1.txt"), MOVE_DISTANCE_MAX * 4)?,
                read_fixed(&p("MoveDistance2.txt"), MOVE_DISTANCE_MAX * 4)?,
                read_fixed(&p("MoveDistance3.txt"), MOVE_DISTANCE_MAX * 4)?,
                read_fixed(&p("MoveDistance4.txt"), MOVE_DISTANCE_MAX * 4)?,
            ],
            pat3: read_pat3(&p("Pat3.txt"))?,
            md2: read_sparse_by_code(&p("MD2.txt"))?,
            md3: read_sparse_by_hash(&p("MD3.txt"))?,
            md4: read_sparse_by_hash(&p("MD4.txt"))?,
            md5: read_sparse_by_hash(&p("MD5.txt"))?,
        })
    }
}

/// First-order-only gamma, used by the simulation engine's lighter MM-style
/// sampler (§4.E). Loaded from `<workdir>/sim_params/`; same family
/// filenames, but each record is a single scalar rather than `w` plus a
/// latent vector.
pub struct SimParams {
    pub pass: Vec<f64>,
    pub ko_exist: f64,
    pub capture: Vec<f64>,
    pub save_extension: Vec<f64>,
    pub atari: Vec<f64>,
    pub extension: Vec<f64>,
    pub dame: Vec<f64>,
    pub connect: Vec<f64>,
    pub throw_in: Vec<f64>,
    pub pat3: Vec<f64>,
}

fn read_gamma_only(path: &Path, n: usize) -> Result<Vec<f64>, ParamLoadError> {
    let mut tok = Tokenizer::open(path)?;
    let mut out = Vec::with_capacity(n);
    for i in 0..n {
        match tok.next_f64(path)? {
            Some(w) => out.push(w),
            None => {
                return Err(ParamLoadError::Truncated {
                    path: path.to_path_buf(),
                    records: i,
                    expected: n,
                })
            }
        }
    }
    Ok(out)
}

impl SimParams {
    pub fn load(dir: &Path) -> Result<Self, ParamLoadError> {
        const CAPTURE_MAX: usize = 8;
        const SAVE_EXTENSION_MAX: usize = 2;
        const ATARI_MAX: usize = 2;
        const EXTENSION_MAX: usize = 4;
        const DAME_MAX: usize = 2;
        const CONNECT_MAX: usize = 2;
        const THROW_IN_MAX: usize = 2;

        let p = |name: &str| dir.join(name);
        Ok(SimParams {
            pass: read_gamma_only(&p("Pass.txt"), PASS_MAX)?,
            ko_exist: read_gamma_only(&p("KoExist.txt"), 1)?[0],
            capture: read_gamma_only(&p("CaptureFeature.txt"), CAPTURE_MAX)?,
            save_extension: read_gamma_only(&p("SaveExtensionFeature.txt"), SAVE_EXTENSION_MAX)?,
            atari: read_gamma_only(&p("AtariFeature.txt"), ATARI_MAX)?,
            extension: read_gamma_only(&p("ExtensionFeature.txt"), EXTENSION_MAX)?,
            dame: read_gamma_only(&p("DameFeature.txt"), DAME_MAX)?,
            connect: read_gamma_only(&p("ConnectionFeature.txt"), CONNECT_MAX)?,
            throw_in: read_gamma_only(&p("ThrowInFeature.txt"), THROW_IN_MAX)?,
            pat3: read_gamma_only(&p("Pat3.txt"), crate::patterns::PAT3_MAX)?,
        })
    }
}
