//! Error injection framework for the mock scanner.
//!
//! Failures come out as [`TransportError`]s, exactly what a real transport
//! would hand the reader: an RPC error with the device's code and message, an
//! unparsable response, or a service that stopped answering.

use super::rng::MockRng;
use bcr_core::error::{TransportError, FUNCTION_FAILED};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Operation names checked by the mock scanner.
pub mod ops {
    pub const OPEN: &str = "open";
    pub const CLOSE: &str = "close";
    pub const GET_PROPERTIES: &str = "get_properties";
    pub const SET_PROPERTIES: &str = "set_properties";
    pub const SET_TRIGGER: &str = "set_trigger";
    pub const LIST_SCANNERS: &str = "list_scanners";
}

/// Error injection configuration.
#[derive(Clone, Debug)]
pub struct ErrorConfig {
    /// Per-operation failure rate (0.0 to 1.0); `"*"` applies to all.
    failure_rates: Arc<HashMap<&'static str, f64>>,
    scenarios: Arc<Vec<ErrorScenario>>,
    rng: Arc<MockRng>,
    state: Arc<Mutex<ErrorState>>,
}

#[derive(Debug, Clone)]
pub enum ErrorScenario {
    /// Fail after N successful calls of `operation`
    FailAfterN {
        operation: &'static str,
        count: u32,
    },
    /// `operation` never answers
    NotResponding { operation: &'static str },
    /// `operation` answers with a JSON-RPC error
    RpcError {
        operation: &'static str,
        code: i32,
        message: String,
    },
    /// `operation` answers with something that is not a valid response
    MalformedResponse { operation: &'static str },
    /// The service goes away on the first call and stays away
    ServiceLoss,
}

#[derive(Default, Debug)]
struct ErrorState {
    operation_counts: HashMap<&'static str, u32>,
    service_lost: bool,
}

impl ErrorConfig {
    /// No injected errors (default)
    pub fn none() -> Self {
        Self::build(HashMap::new(), Vec::new(), None)
    }

    /// Uniform random failures with a fixed seed
    pub fn random_failures_seeded(rate: f64, seed: Option<u64>) -> Self {
        let mut rates = HashMap::new();
        rates.insert("*", rate);
        Self::build(rates, Vec::new(), seed)
    }

    pub fn scenario(scenario: ErrorScenario) -> Self {
        Self::scenarios(vec![scenario])
    }

    pub fn scenarios(scenarios: Vec<ErrorScenario>) -> Self {
        Self::build(HashMap::new(), scenarios, None)
    }

    /// Custom failure rates per operation
    pub fn with_rates(rates: HashMap<&'static str, f64>, seed: Option<u64>) -> Self {
        Self::build(rates, Vec::new(), seed)
    }

    fn build(
        rates: HashMap<&'static str, f64>,
        scenarios: Vec<ErrorScenario>,
        seed: Option<u64>,
    ) -> Self {
        Self {
            failure_rates: Arc::new(rates),
            scenarios: Arc::new(scenarios),
            rng: Arc::new(MockRng::new(seed)),
            state: Arc::new(Mutex::new(ErrorState::default())),
        }
    }

    /// Check whether `operation` should fail, returning the injected error.
    pub fn check_operation(&self, operation: &'static str) -> Result<(), TransportError> {
        let mut state = self.state.lock();

        if state.service_lost {
            return Err(TransportError::not_responding());
        }

        for scenario in self.scenarios.iter() {
            match scenario {
                ErrorScenario::FailAfterN {
                    operation: op,
                    count,
                } if *op == operation => {
                    let current = state.operation_counts.entry(operation).or_insert(0);
                    *current += 1;
                    if *current > *count {
                        return Err(TransportError::new(
                            FUNCTION_FAILED,
                            format!("Injected failure after {} operations", count),
                        ));
                    }
                }
                ErrorScenario::NotResponding { operation: op } if *op == operation => {
                    return Err(TransportError::not_responding());
                }
                ErrorScenario::RpcError {
                    operation: op,
                    code,
                    message,
                } if *op == operation => {
                    return Err(TransportError::new(*code, message.clone()));
                }
                ErrorScenario::MalformedResponse { operation: op } if *op == operation => {
                    return Err(TransportError::parse_error());
                }
                ErrorScenario::ServiceLoss => {
                    state.service_lost = true;
                    return Err(TransportError::not_responding());
                }
                _ => {}
            }
        }

        let rate = self
            .failure_rates
            .get(operation)
            .or_else(|| self.failure_rates.get("*"))
            .copied()
            .unwrap_or(0.0);

        if self.rng.should_fail(rate) {
            return Err(TransportError::new(
                FUNCTION_FAILED,
                format!("Random failure on operation '{}'", operation),
            ));
        }

        Ok(())
    }

    /// Clear counters and lost-service state.
    pub fn reset(&self) {
        *self.state.lock() = ErrorState::default();
    }
}

impl Default for ErrorConfig {
    fn default() -> Self {
        Self::none()
    }
}
