//! Applies a configuration's strategy chain to a filename or a payload.

use crate::domain::model::{Payload, Phase};
use crate::domain::ports::{Rejection, Strategy, StrategyContext};
use crate::utils::error::{FileSystemError, Result};
use std::sync::Arc;
use tracing::{debug, warn};

fn rejected(
    strategy: &dyn Strategy,
    phase: Phase,
    rejection: Rejection,
    context: &StrategyContext<'_>,
) -> FileSystemError {
    warn!(
        config = context.config,
        %phase,
        strategy = strategy.name(),
        reason = %rejection,
        "Operation blocked by strategy"
    );
    FileSystemError::StrategyRejected {
        strategy: strategy.name().to_string(),
        phase,
        reason: rejection.reason,
    }
}

/// Runs `filename` through every strategy in order, each one receiving the
/// previous output. Disabled strategies return the filename untouched.
pub fn apply_to_filename(
    phase: Phase,
    strategies: &[Arc<dyn Strategy>],
    filename: String,
    context: &StrategyContext<'_>,
) -> Result<String> {
    if !context.options.strategies {
        return Ok(filename);
    }

    let mut current = filename;
    for strategy in strategies {
        current = strategy
            .apply_to_filename(phase, current, context)
            .map_err(|rejection| rejected(strategy.as_ref(), phase, rejection, context))?;
        if current.is_empty() {
            return Err(rejected(
                strategy.as_ref(),
                phase,
                Rejection::new("strategy produced an empty filename"),
                context,
            ));
        }
        debug!(strategy = strategy.name(), %phase, filename = %current, "Applied strategy");
    }
    Ok(current)
}

/// Runs the write payload through every strategy in order. An empty payload
/// is a valid result.
pub fn apply_to_payload(
    strategies: &[Arc<dyn Strategy>],
    payload: Payload,
    context: &StrategyContext<'_>,
) -> Result<Payload> {
    if !context.options.strategies {
        return Ok(payload);
    }

    let mut current = payload;
    for strategy in strategies {
        current = strategy
            .apply_to_payload(current, context)
            .map_err(|rejection| rejected(strategy.as_ref(), Phase::Write, rejection, context))?;
        debug!(strategy = strategy.name(), "Applied payload strategy");
    }
    Ok(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::Options;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Prefix(&'static str);

    impl Strategy for Prefix {
        fn name(&self) -> &str {
            "Prefix"
        }

        fn applies_to(&self, phase: Phase) -> bool {
            phase.is_filename()
        }

        fn apply_to_filename(
            &self,
            _phase: Phase,
            filename: String,
            _context: &StrategyContext<'_>,
        ) -> std::result::Result<String, Rejection> {
            Ok(format!("{}/{}", self.0, filename))
        }
    }

    struct Deny(AtomicUsize);

    impl Strategy for Deny {
        fn name(&self) -> &str {
            "Deny"
        }

        fn applies_to(&self, _phase: Phase) -> bool {
            true
        }

        fn apply_to_filename(
            &self,
            _phase: Phase,
            _filename: String,
            _context: &StrategyContext<'_>,
        ) -> std::result::Result<String, Rejection> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Err(Rejection::new("denied"))
        }

        fn apply_to_payload(
            &self,
            _payload: Payload,
            _context: &StrategyContext<'_>,
        ) -> std::result::Result<Payload, Rejection> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Err(Rejection::new("denied"))
        }
    }

    struct Blank;

    impl Strategy for Blank {
        fn name(&self) -> &str {
            "Blank"
        }

        fn applies_to(&self, _phase: Phase) -> bool {
            true
        }

        fn apply_to_filename(
            &self,
            _phase: Phase,
            _filename: String,
            _context: &StrategyContext<'_>,
        ) -> std::result::Result<String, Rejection> {
            Ok(String::new())
        }

        fn apply_to_payload(
            &self,
            _payload: Payload,
            _context: &StrategyContext<'_>,
        ) -> std::result::Result<Payload, Rejection> {
            Ok(Payload::Bytes(Vec::new()))
        }
    }

    fn context(options: &Options) -> StrategyContext<'_> {
        StrategyContext {
            config: "default",
            filename: "a.txt",
            options,
        }
    }

    #[test]
    fn test_filename_chain_applies_in_order() {
        let options = Options::default();
        let strategies: Vec<Arc<dyn Strategy>> = vec![Arc::new(Prefix("b")), Arc::new(Prefix("a"))];
        let result = apply_to_filename(
            Phase::FilenameWrite,
            &strategies,
            "x.txt".to_string(),
            &context(&options),
        )
        .unwrap();
        assert_eq!(result, "a/b/x.txt");
    }

    #[test]
    fn test_rejection_stops_chain() {
        let options = Options::default();
        let deny = Arc::new(Deny(AtomicUsize::new(0)));
        let strategies: Vec<Arc<dyn Strategy>> =
            vec![deny.clone() as Arc<dyn Strategy>, deny.clone() as Arc<dyn Strategy>];
        let err = apply_to_filename(
            Phase::FilenameRead,
            &strategies,
            "x.txt".to_string(),
            &context(&options),
        )
        .unwrap_err();

        match err {
            FileSystemError::StrategyRejected {
                strategy, phase, ..
            } => {
                assert_eq!(strategy, "Deny");
                assert_eq!(phase, Phase::FilenameRead);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(deny.0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_disabled_strategies_pass_through() {
        let options = Options::without_strategies();
        let deny = Arc::new(Deny(AtomicUsize::new(0)));
        let strategies: Vec<Arc<dyn Strategy>> = vec![deny.clone() as Arc<dyn Strategy>];

        let filename = apply_to_filename(
            Phase::FilenameWrite,
            &strategies,
            "x.txt".to_string(),
            &context(&options),
        )
        .unwrap();
        let payload = apply_to_payload(&strategies, Payload::from("raw"), &context(&options)).unwrap();

        assert_eq!(filename, "x.txt");
        assert_eq!(payload, Payload::from("raw"));
        assert_eq!(deny.0.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_empty_filename_rejects_but_empty_payload_does_not() {
        let options = Options::default();
        let strategies: Vec<Arc<dyn Strategy>> = vec![Arc::new(Blank)];

        assert!(matches!(
            apply_to_filename(
                Phase::FilenameDelete,
                &strategies,
                "x.txt".to_string(),
                &context(&options)
            ),
            Err(FileSystemError::StrategyRejected { .. })
        ));

        let payload = apply_to_payload(&strategies, Payload::from("data"), &context(&options)).unwrap();
        assert_eq!(payload, Payload::Bytes(Vec::new()));
    }
}
