//! Recording mock collaborators shared by the supervisor and copilot tests.

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};

use deskpilot_contracts::{
    error::{DeskpilotError, DeskpilotResult},
    guard::{GuardResult, RiskLevel, ScreeningStage},
    provenance::ProvenanceRecord,
    retrieval::{PassageMetadata, RetrievalResult, RetrievedPassage},
    review::{ReviewFailure, ReviewReport, ReviewSchema},
    ticket::{TicketReceipt, TicketRequest, TicketStatus},
};

use crate::{
    config::CopilotConfig,
    supervisor::{Collaborators, Supervisor},
    traits::{Guard, ProvenanceSink, Retriever, Reviewer, TicketingBackend},
};

pub fn retrieval_with(n: usize) -> RetrievalResult {
    let passages: Vec<RetrievedPassage> = (0..n)
        .map(|i| RetrievedPassage {
            id: format!("passage-{i}"),
            content: format!("Content of document {i}."),
            source: format!("Doc {i}"),
            score: 0.85 - i as f64 * 0.05,
            metadata: PassageMetadata {
                title: format!("Doc {i}"),
                last_updated: Utc::now(),
                section: None,
                url: Some(format!("https://kb.example/doc-{i}")),
            },
        })
        .collect();
    RetrievalResult {
        sources: passages.iter().map(|p| p.source.clone()).collect(),
        total_results: passages.len(),
        passages,
        query_latency_ms: 1,
    }
}

/// Blocks input containing "BLOCK" (high) and output containing "LEAK" (high).
/// Input containing "MEDIUM" is flagged at medium risk.
pub struct MockGuard;

impl Guard for MockGuard {
    fn screen_input(&self, text: &str) -> GuardResult {
        let (risk, flags) = if text.contains("BLOCK") {
            (RiskLevel::High, vec!["Potential prompt injection detected".to_string()])
        } else if text.contains("MEDIUM") {
            (RiskLevel::Medium, vec!["Potential PII detected".to_string()])
        } else {
            (RiskLevel::Low, vec![])
        };
        GuardResult::from_findings(
            ScreeningStage::Input,
            risk,
            flags,
            ScreeningStage::Input.default_max_passing_risk(),
            self.ruleset_version(),
        )
    }

    fn screen_output(&self, text: &str) -> GuardResult {
        let (risk, flags) = if text.contains("LEAK") {
            (RiskLevel::High, vec!["PII detected in output".to_string()])
        } else {
            (RiskLevel::Low, vec![])
        };
        GuardResult::from_findings(
            ScreeningStage::Output,
            risk,
            flags,
            ScreeningStage::Output.default_max_passing_risk(),
            self.ruleset_version(),
        )
    }

    fn ruleset_version(&self) -> &str {
        "mock-rules-1"
    }
}

enum RetrieverMode {
    Fixed(RetrievalResult),
    Failing,
    Slow(Duration),
}

pub struct MockRetriever {
    mode: RetrieverMode,
    calls: Arc<Mutex<u32>>,
}

impl MockRetriever {
    pub fn returning(result: RetrievalResult) -> Self {
        Self {
            mode: RetrieverMode::Fixed(result),
            calls: Arc::new(Mutex::new(0)),
        }
    }

    pub fn failing() -> Self {
        Self {
            mode: RetrieverMode::Failing,
            calls: Arc::new(Mutex::new(0)),
        }
    }

    pub fn slow(delay: Duration) -> Self {
        Self {
            mode: RetrieverMode::Slow(delay),
            calls: Arc::new(Mutex::new(0)),
        }
    }
}

#[async_trait]
impl Retriever for MockRetriever {
    async fn retrieve(&self, _query: &str) -> DeskpilotResult<RetrievalResult> {
        *self.calls.lock().unwrap() += 1;
        match &self.mode {
            RetrieverMode::Fixed(result) => Ok(result.clone()),
            RetrieverMode::Failing => Err(DeskpilotError::RetrievalUnavailable {
                reason: "search backend returned 503".to_string(),
            }),
            RetrieverMode::Slow(delay) => {
                tokio::time::sleep(*delay).await;
                Ok(retrieval_with(2))
            }
        }
    }
}

pub struct MockReviewer {
    pass: bool,
    calls: Arc<Mutex<u32>>,
}

impl Reviewer for MockReviewer {
    fn review(&self, _output: &Value, _schema: &ReviewSchema) -> DeskpilotResult<ReviewReport> {
        *self.calls.lock().unwrap() += 1;
        if self.pass {
            Ok(ReviewReport {
                passed: true,
                failures: vec![],
            })
        } else {
            Ok(ReviewReport {
                passed: false,
                failures: vec![ReviewFailure {
                    rule_id: "scores-non-increasing".to_string(),
                    message: "passage 1 outranks passage 0".to_string(),
                }],
            })
        }
    }
}

pub struct MockTicketing {
    fail: bool,
    delay: Option<Duration>,
    submitted: Arc<Mutex<Vec<TicketRequest>>>,
}

#[async_trait]
impl TicketingBackend for MockTicketing {
    async fn submit(&self, request: &TicketRequest) -> DeskpilotResult<TicketReceipt> {
        self.submitted.lock().unwrap().push(request.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(DeskpilotError::TicketingFailed {
                reason: "service desk unreachable".to_string(),
            });
        }
        let status = if request.requires_approval {
            TicketStatus::PendingApproval
        } else {
            TicketStatus::New
        };
        Ok(TicketReceipt {
            ticket_id: "INC-000001".to_string(),
            accepted: true,
            status,
        })
    }
}

/// Records every appended record; optionally fails every write.
pub struct MockSink {
    pub records: Arc<Mutex<Vec<ProvenanceRecord>>>,
    pub fail: bool,
}

impl MockSink {
    pub fn new() -> Self {
        Self {
            records: Arc::new(Mutex::new(vec![])),
            fail: false,
        }
    }
}

impl ProvenanceSink for MockSink {
    fn append(&self, record: &ProvenanceRecord) -> DeskpilotResult<()> {
        if self.fail {
            return Err(DeskpilotError::LedgerWriteFailed {
                reason: "disk full".to_string(),
            });
        }
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }
}

/// Builds a supervisor over mock collaborators and keeps handles to their
/// call counters.
pub struct Harness {
    config: CopilotConfig,
    retriever: MockRetriever,
    reviewer_passes: bool,
    ticketing_fails: bool,
    ticketing_delay: Option<Duration>,
    pub retrievals: Arc<Mutex<u32>>,
    pub reviews: Arc<Mutex<u32>>,
    pub tickets: Arc<Mutex<Vec<TicketRequest>>>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(CopilotConfig::default())
    }

    pub fn with_config(config: CopilotConfig) -> Self {
        Self {
            config,
            retriever: MockRetriever::returning(retrieval_with(2)),
            reviewer_passes: true,
            ticketing_fails: false,
            ticketing_delay: None,
            retrievals: Arc::new(Mutex::new(0)),
            reviews: Arc::new(Mutex::new(0)),
            tickets: Arc::new(Mutex::new(vec![])),
        }
    }

    pub fn retriever(mut self, retriever: MockRetriever) -> Self {
        self.retriever = retriever;
        self
    }

    pub fn reviewer_passes(mut self, pass: bool) -> Self {
        self.reviewer_passes = pass;
        self
    }

    pub fn ticketing_fails(mut self) -> Self {
        self.ticketing_fails = true;
        self
    }

    /// The desk takes `delay` to answer, after the request was received.
    pub fn ticketing_slow(mut self, delay: Duration) -> Self {
        self.ticketing_delay = Some(delay);
        self
    }

    pub fn supervisor(&self) -> Supervisor {
        let retriever = MockRetriever {
            mode: match &self.retriever.mode {
                RetrieverMode::Fixed(r) => RetrieverMode::Fixed(r.clone()),
                RetrieverMode::Failing => RetrieverMode::Failing,
                RetrieverMode::Slow(d) => RetrieverMode::Slow(*d),
            },
            calls: self.retrievals.clone(),
        };
        let collaborators = Collaborators {
            guard: Arc::new(MockGuard),
            retriever: Arc::new(retriever),
            reviewer: Arc::new(MockReviewer {
                pass: self.reviewer_passes,
                calls: self.reviews.clone(),
            }),
            ticketing: Arc::new(MockTicketing {
                fail: self.ticketing_fails,
                delay: self.ticketing_delay,
                submitted: self.tickets.clone(),
            }),
        };
        Supervisor::new(self.config.clone(), collaborators, review_schema())
    }
}

pub fn review_schema() -> ReviewSchema {
    ReviewSchema {
        schema_id: "mock-review-v1".to_string(),
        json_schema: json!(null),
        rules: vec![],
    }
}
