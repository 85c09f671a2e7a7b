use metrics_exporter_prometheus::PrometheusHandle;
use risk_gate::decisioning::{
    AlternateDataError, AlternateDataProvider, BureauClient, BureauPayload, BureauTransportError,
    ConfigStore, DocumentIdentifier, EvaluationId, EvaluationRecord, EvaluationRepository,
    RepositoryError, SubjectId,
};
use risk_gate::error::AppError;
use serde::Deserialize;
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryEvaluationRepository {
    records: Arc<Mutex<HashMap<EvaluationId, EvaluationRecord>>>,
}

impl EvaluationRepository for InMemoryEvaluationRepository {
    fn insert(&self, record: EvaluationRecord) -> Result<EvaluationRecord, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(record.evaluation_id()) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(record.evaluation_id().clone(), record.clone());
        Ok(record)
    }

    fn fetch(&self, id: &EvaluationId) -> Result<Option<EvaluationRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }
}

/// Bureau client answering from a JSON document keyed by document value.
///
/// Subjects missing from the fixture come back as NOT_FOUND, the same answer a live bureau
/// gives for an unknown applicant.
#[derive(Debug, Default, Clone)]
pub(crate) struct FixtureBureauClient {
    entries: HashMap<String, BureauPayload>,
}

impl FixtureBureauClient {
    pub(crate) fn from_reader<R: Read>(reader: R) -> Result<Self, AppError> {
        let entries: HashMap<String, BureauPayload> = serde_json::from_reader(reader)
            .map_err(|err| AppError::Fixture(format!("invalid bureau fixture: {err}")))?;
        Ok(Self {
            entries: entries
                .into_iter()
                .map(|(document, payload)| (document.trim().to_string(), payload))
                .collect(),
        })
    }

    pub(crate) fn from_path(path: &Path) -> Result<Self, AppError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

impl BureauClient for FixtureBureauClient {
    fn lookup(
        &self,
        documents: &[DocumentIdentifier],
    ) -> Result<Option<BureauPayload>, BureauTransportError> {
        Ok(documents
            .iter()
            .find_map(|document| self.entries.get(document.value.trim()).cloned()))
    }
}

#[derive(Debug, Deserialize)]
struct HistoryRow {
    subject_id: String,
    signal: f64,
}

/// Alternate-data provider backed by a `subject_id,signal` CSV export.
#[derive(Debug, Default, Clone)]
pub(crate) struct CsvHistoryProvider {
    signals: HashMap<String, f64>,
}

impl CsvHistoryProvider {
    pub(crate) fn from_reader<R: Read>(reader: R) -> Result<Self, AppError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut signals = HashMap::new();

        for (index, row) in csv_reader.deserialize::<HistoryRow>().enumerate() {
            let row = row.map_err(|err| AppError::Fixture(format!("invalid history row: {err}")))?;
            if !(0.0..=1.0).contains(&row.signal) {
                return Err(AppError::Fixture(format!(
                    "history row {} for '{}' has signal {} outside [0, 1]",
                    index + 1,
                    row.subject_id,
                    row.signal
                )));
            }
            signals.insert(row.subject_id, row.signal);
        }

        Ok(Self { signals })
    }

    pub(crate) fn from_path(path: &Path) -> Result<Self, AppError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub(crate) fn len(&self) -> usize {
        self.signals.len()
    }
}

impl AlternateDataProvider for CsvHistoryProvider {
    fn history_signal(&self, subject: &SubjectId) -> Result<Option<f64>, AlternateDataError> {
        Ok(self.signals.get(&subject.0).copied())
    }
}

pub(crate) fn load_config_store(path: Option<&Path>) -> Result<ConfigStore, AppError> {
    match path {
        Some(path) => Ok(ConfigStore::from_path(path)?),
        None => Ok(ConfigStore::default()),
    }
}

pub(crate) fn load_bureau(path: Option<&Path>) -> Result<FixtureBureauClient, AppError> {
    path.map_or_else(|| Ok(FixtureBureauClient::default()), FixtureBureauClient::from_path)
}

pub(crate) fn load_history(path: Option<&Path>) -> Result<CsvHistoryProvider, AppError> {
    path.map_or_else(|| Ok(CsvHistoryProvider::default()), CsvHistoryProvider::from_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use risk_gate::decisioning::DocumentKind;
    use std::io::Cursor;

    fn document(value: &str) -> DocumentIdentifier {
        DocumentIdentifier {
            kind: DocumentKind::NationalId,
            value: value.to_string(),
        }
    }

    #[test]
    fn fixture_bureau_answers_known_documents() {
        let fixture = r#"{
            "GOMJ800101": {
                "score_raw": 712,
                "reasons": [{"code": "RECENT_INQUIRY", "description": "Inquiry in last 30 days"}],
                "reference_id": "bureau-712"
            }
        }"#;
        let client = FixtureBureauClient::from_reader(Cursor::new(fixture)).expect("fixture parses");

        let found = client
            .lookup(&[document("UNKNOWN"), document("GOMJ800101")])
            .expect("lookup succeeds")
            .expect("subject known");
        assert_eq!(found.score_raw, 712);
        assert_eq!(found.reasons[0].code, "RECENT_INQUIRY");

        assert_eq!(client.lookup(&[document("UNKNOWN")]).expect("lookup"), None);
    }

    #[test]
    fn malformed_bureau_fixture_is_rejected() {
        let error = FixtureBureauClient::from_reader(Cursor::new("[1, 2]")).expect_err("not a map");
        assert!(matches!(error, AppError::Fixture(_)));
    }

    #[test]
    fn history_csv_maps_subjects_to_signals() {
        let csv = "subject_id,signal\nsubject-001, 0.82\nsubject-002,0.40\n";
        let provider = CsvHistoryProvider::from_reader(Cursor::new(csv)).expect("csv parses");

        assert_eq!(provider.len(), 2);
        assert_eq!(
            provider
                .history_signal(&SubjectId("subject-001".to_string()))
                .expect("lookup"),
            Some(0.82)
        );
        assert_eq!(
            provider
                .history_signal(&SubjectId("subject-404".to_string()))
                .expect("lookup"),
            None
        );
    }

    #[test]
    fn history_signal_outside_unit_range_is_rejected() {
        let csv = "subject_id,signal\nsubject-001,1.7\n";
        let error = CsvHistoryProvider::from_reader(Cursor::new(csv)).expect_err("out of range");
        assert!(error.to_string().contains("outside [0, 1]"));
    }
}
