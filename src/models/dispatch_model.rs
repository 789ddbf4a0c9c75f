use serde::{Deserialize, Serialize};

/// Resumen de un lote de envíos (lo que la UI muestra como notificación)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DispatchSummary {
    pub due: usize,
    pub sent: usize,
    pub failed: usize,
    /// No vencidos todavía
    pub skipped: usize,
    /// Otro dispatcher ganó el claim
    pub lost_claims: usize,
    pub failures: Vec<DispatchFailure>,
}

impl DispatchSummary {
    pub fn record(&mut self, outcome: DispatchOutcome) {
        match outcome {
            DispatchOutcome::Sent => self.sent += 1,
            DispatchOutcome::LostClaim => self.lost_claims += 1,
            DispatchOutcome::Failed(failure) => {
                self.failed += 1;
                self.failures.push(failure);
            }
        }
    }

    pub fn merge(&mut self, other: DispatchSummary) {
        self.due += other.due;
        self.sent += other.sent;
        self.failed += other.failed;
        self.skipped += other.skipped;
        self.lost_claims += other.lost_claims;
        self.failures.extend(other.failures);
    }
}

/// Un envío fallido. Los envíos programados llevan `scheduled_id`; los
/// inmediatos solo el log, si llegó a crearse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchFailure {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_id: Option<String>,
    pub recipient: String,
    pub reason: String,
}

/// Resultado de procesar un solo registro
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    Sent,
    Failed(DispatchFailure),
    LostClaim,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PollRequest {
    pub user_id: String,
}
