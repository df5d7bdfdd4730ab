use anyhow::{anyhow, Context, Result};
use include_dir::{include_dir, Dir};
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use serde_json::from_str;
use std::collections::HashMap;
use std::str::FromStr;
use thiserror::Error;

static TEXT_DIR: Dir = include_dir!("$CARGO_MANIFEST_DIR/src/texts");

/// Difficulty tier selecting which sample pool a session draws from
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    /// Case-insensitive and whitespace-tolerant; unknown tier names map to `Medium`.
    pub fn parse_or_default(name: &str) -> Self {
        name.trim().parse().unwrap_or_default()
    }

    pub fn next(self) -> Self {
        match self {
            Difficulty::Easy => Difficulty::Medium,
            Difficulty::Medium => Difficulty::Hard,
            Difficulty::Hard => Difficulty::Easy,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown difficulty '{0}'")]
pub struct UnknownDifficulty(pub String);

impl FromStr for Difficulty {
    type Err = UnknownDifficulty;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Difficulty::ALL
            .into_iter()
            .find(|tier| tier.to_string().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownDifficulty(s.to_string()))
    }
}

#[derive(Deserialize, Clone, Debug)]
struct TextPool {
    name: String,
    texts: Vec<String>,
}

/// Fixed pools of sample strings keyed by difficulty tier
#[derive(Debug, Clone)]
pub struct TextProvider {
    pools: HashMap<Difficulty, Vec<String>>,
}

impl TextProvider {
    /// Pools shipped inside the binary (`src/texts/*.json`).
    pub fn embedded() -> Result<Self> {
        let mut pools = HashMap::new();
        for tier in Difficulty::ALL {
            let pool = read_pool(&format!("{tier}.json"))?;
            log::debug!("loaded {} samples for tier {}", pool.texts.len(), pool.name);
            pools.insert(tier, pool.texts);
        }
        Ok(Self { pools })
    }

    pub fn with_pools(pools: HashMap<Difficulty, Vec<String>>) -> Self {
        Self { pools }
    }

    /// A provider that always returns `text`, whatever the tier.
    pub fn single(text: impl Into<String>) -> Self {
        let text = text.into();
        Self::with_pools(
            Difficulty::ALL
                .into_iter()
                .map(|tier| (tier, vec![text.clone()]))
                .collect(),
        )
    }

    pub fn pool(&self, tier: Difficulty) -> &[String] {
        self.pools.get(&tier).map(Vec::as_slice).unwrap_or_default()
    }

    /// Uniformly pick a sample for `tier`, falling back to the medium pool
    /// when the tier has nothing to offer. Empty string if both are empty.
    pub fn sample(&self, tier: Difficulty) -> String {
        let rng = &mut rand::thread_rng();
        let pool = match self.pool(tier) {
            [] => self.pool(Difficulty::Medium),
            texts => texts,
        };
        pool.choose(rng).cloned().unwrap_or_default()
    }

    pub fn sample_named(&self, tier: &str) -> String {
        self.sample(Difficulty::parse_or_default(tier))
    }
}

fn read_pool(file_name: &str) -> Result<TextPool> {
    let file = TEXT_DIR
        .get_file(file_name)
        .ok_or_else(|| anyhow!("text pool {file_name} not found"))?;

    let contents = file
        .contents_utf8()
        .ok_or_else(|| anyhow!("text pool {file_name} is not utf-8"))?;

    from_str(contents).with_context(|| format!("unable to deserialize text pool {file_name}"))
}
