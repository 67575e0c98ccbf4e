//! Call eligibility.
//!
//! A call only reaches a handler when it was committed (no failure marker,
//! at least one event) and a handler is registered for its name.

use std::sync::Arc;

use crate::ports::{CallHandler, HandlerRegistry, RawBlock, RawCall};
use crate::schema::system::EXTRINSIC_FAILED;

/// Why a call is dropped before extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exclusion {
    /// The call's events contain `System.ExtrinsicFailed`.
    ExtrinsicFailed,
    /// The call emitted no events at all, which is read as "not committed".
    NoEvents,
}

/// Policy exclusion for a call, if any.
pub fn exclusion(call: &RawCall) -> Option<Exclusion> {
    if call.events.is_empty() {
        return Some(Exclusion::NoEvents);
    }
    if call.events.iter().any(|e| e.name == EXTRINSIC_FAILED) {
        return Some(Exclusion::ExtrinsicFailed);
    }
    None
}

/// Calls of `block` that should be extracted, in execution order, paired with
/// their handler.
///
/// Excluded calls and calls without a handler are skipped silently.
pub fn eligible_calls<'a>(
    block: &'a RawBlock,
    handlers: &'a HandlerRegistry,
) -> impl Iterator<Item = (&'a RawCall, &'a Arc<dyn CallHandler>)> + 'a {
    block.calls.iter().filter_map(move |call| {
        if exclusion(call).is_some() {
            return None;
        }
        handlers.get(&call.name).map(|handler| (call, handler))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DomainResult;
    use crate::models::TransferEvent;
    use crate::ports::{CallContext, RawEvent};

    struct Noop;

    impl CallHandler for Noop {
        fn name(&self) -> &'static str {
            "noop"
        }
        fn call_names(&self) -> &'static [&'static str] {
            &["Balances.transfer"]
        }
        fn extract(&self, _: &CallContext<'_>) -> DomainResult<Option<TransferEvent>> {
            Ok(None)
        }
    }

    fn event(name: &str) -> RawEvent {
        RawEvent {
            index: 0,
            name: name.into(),
            args: serde_json::Value::Null,
            extrinsic_index: Some(1),
        }
    }

    fn call(id: &str, name: &str, events: Vec<RawEvent>) -> RawCall {
        RawCall {
            id: id.into(),
            name: name.into(),
            extrinsic_index: Some(1),
            args: serde_json::Value::Null,
            events,
        }
    }

    #[test]
    fn test_exclusion_reasons() {
        assert_eq!(
            exclusion(&call("a", "Balances.transfer", vec![])),
            Some(Exclusion::NoEvents)
        );
        assert_eq!(
            exclusion(&call(
                "b",
                "Balances.transfer",
                vec![event("Balances.Withdraw"), event(EXTRINSIC_FAILED)]
            )),
            Some(Exclusion::ExtrinsicFailed)
        );
        assert_eq!(
            exclusion(&call("c", "Balances.transfer", vec![event("Balances.Transfer")])),
            None
        );
    }

    // Test critique: l'ordre d'exécution est préservé et les appels inconnus ignorés
    #[test]
    fn test_eligible_calls_keep_order_and_skip_unknown_names() {
        let mut handlers = HandlerRegistry::new();
        handlers.register(Arc::new(Noop));

        let block = RawBlock {
            number: 1,
            hash: [0; 32],
            timestamp: Some(0),
            spec_version: 2001,
            extrinsics: vec![],
            calls: vec![
                call("1", "Balances.transfer", vec![event("Balances.Transfer")]),
                call("2", "System.remark", vec![event("System.ExtrinsicSuccess")]),
                call("3", "Balances.transfer", vec![]),
                call("4", "Balances.transfer", vec![event("Balances.Transfer")]),
            ],
        };

        let ids: Vec<_> = eligible_calls(&block, &handlers)
            .map(|(call, _)| call.id.as_str())
            .collect();
        assert_eq!(ids, vec!["1", "4"]);
    }
}
