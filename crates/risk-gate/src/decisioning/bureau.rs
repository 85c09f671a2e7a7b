use serde::{Deserialize, Serialize};

use super::config::BureauPolicy;
use super::domain::DocumentIdentifier;

/// Raw payload returned by the bureau collaborator for a subject it knows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BureauPayload {
    pub score_raw: u16,
    #[serde(default)]
    pub reasons: Vec<BureauReason>,
    pub reference_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BureauReason {
    pub code: String,
    pub description: String,
}

/// Transport failure reported by the bureau client. Retries are the client's concern.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("bureau transport failure: {0}")]
pub struct BureauTransportError(pub String);

/// External credit bureau lookup. `Ok(None)` means the subject is unknown to the bureau.
///
/// The service runs `lookup` on the blocking pool and stops waiting after
/// `timeouts.bureau_ms`, but the thread keeps running until `lookup` returns. Clients must
/// enforce their own transport deadline, or a hung bureau will exhaust the blocking pool.
pub trait BureauClient: Send + Sync {
    fn lookup(
        &self,
        documents: &[DocumentIdentifier],
    ) -> Result<Option<BureauPayload>, BureauTransportError>;
}

/// Every way a lookup can end, made explicit so the adapter handles each one.
#[derive(Debug, Clone, PartialEq)]
pub enum BureauLookup {
    Found(BureauPayload),
    NotFound,
    Transport(BureauTransportError),
    TimedOut { after_ms: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScoreBand {
    A,
    B,
    C,
    D,
    #[serde(rename = "N/A")]
    NotAvailable,
}

impl ScoreBand {
    pub fn label(&self) -> &'static str {
        match self {
            ScoreBand::A => "A",
            ScoreBand::B => "B",
            ScoreBand::C => "C",
            ScoreBand::D => "D",
            ScoreBand::NotAvailable => "N/A",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BureauStatus {
    Ok,
    NotFound,
}

/// Why a lookup was converted to NOT_FOUND. Decided identically, logged distinctly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BureauFailure {
    Transport { message: String },
    Timeout { after_ms: u64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BureauResult {
    pub score_raw: Option<u16>,
    pub score_band: ScoreBand,
    pub status: BureauStatus,
    pub reasons: Vec<BureauReason>,
    pub reference_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<BureauFailure>,
}

impl BureauResult {
    pub fn not_found(failure: Option<BureauFailure>) -> Self {
        Self {
            score_raw: None,
            score_band: ScoreBand::NotAvailable,
            status: BureauStatus::NotFound,
            reasons: Vec::new(),
            reference_id: None,
            failure,
        }
    }

    pub fn is_found(&self) -> bool {
        self.status == BureauStatus::Ok
    }

    /// Score mapped onto [0, 1] across the bureau's scale.
    pub fn normalized_score(&self, policy: &BureauPolicy) -> Option<f64> {
        let raw = f64::from(self.score_raw?);
        let min = f64::from(policy.score_min);
        let max = f64::from(policy.score_max);
        Some(((raw - min) / (max - min)).clamp(0.0, 1.0))
    }

    pub fn reason_codes(&self) -> impl Iterator<Item = &str> {
        self.reasons.iter().map(|reason| reason.code.as_str())
    }
}

pub fn band_for(score: u16, policy: &BureauPolicy) -> ScoreBand {
    if score >= policy.band_a {
        ScoreBand::A
    } else if score >= policy.band_b {
        ScoreBand::B
    } else if score >= policy.band_c {
        ScoreBand::C
    } else {
        ScoreBand::D
    }
}

/// Normalizes a lookup into the internal bureau result. Never fails: unknown subjects,
/// transport errors, and timeouts all become NOT_FOUND for the gate's fallback path.
pub fn normalize(lookup: BureauLookup, policy: &BureauPolicy) -> BureauResult {
    match lookup {
        BureauLookup::Found(payload) => {
            let score = payload.score_raw.clamp(policy.score_min, policy.score_max);
            BureauResult {
                score_raw: Some(score),
                score_band: band_for(score, policy),
                status: BureauStatus::Ok,
                reasons: payload
                    .reasons
                    .into_iter()
                    .map(|reason| BureauReason {
                        code: reason.code.trim().to_ascii_uppercase(),
                        description: reason.description,
                    })
                    .collect(),
                reference_id: Some(payload.reference_id),
                failure: None,
            }
        }
        BureauLookup::NotFound => BureauResult::not_found(None),
        BureauLookup::Transport(error) => BureauResult::not_found(Some(BureauFailure::Transport {
            message: error.0,
        })),
        BureauLookup::TimedOut { after_ms } => {
            BureauResult::not_found(Some(BureauFailure::Timeout { after_ms }))
        }
    }
}
