use std::future::Future;
use std::sync::Arc;

use webhelm_config::BreakerConfig;

use super::{BreakerSnapshot, CircuitBreaker, GuardError, OperationClass};
use crate::clock::Clock;

/// One breaker per [`OperationClass`].
pub struct BreakerRegistry {
    breakers: [CircuitBreaker; 4],
}

impl BreakerRegistry {
    pub fn new(config: &BreakerConfig, clock: Arc<dyn Clock>) -> Self {
        let breakers =
            OperationClass::ALL.map(|class| CircuitBreaker::new(class, config.clone(), clock.clone()));
        Self { breakers }
    }

    pub fn get(&self, class: OperationClass) -> &CircuitBreaker {
        &self.breakers[class.index()]
    }

    pub async fn guard<T, E, F, Fut, C>(
        &self,
        class: OperationClass,
        f: F,
        counts: C,
    ) -> Result<T, GuardError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        C: Fn(&E) -> bool,
    {
        self.get(class).guard(f, counts).await
    }

    pub fn snapshot(&self) -> Vec<BreakerSnapshot> {
        self.breakers.iter().map(CircuitBreaker::snapshot).collect()
    }
}
