//! Expansion of wrapper extrinsics into the calls they actually dispatch.
//!
//! `Utility.batch`, `Utility.batch_all`, `Utility.force_batch` and
//! `Proxy.proxy` carry other calls in their arguments. Each dispatched leaf
//! becomes its own call, scoped to the events emitted while it ran:
//!
//! - batch items are delimited by `Utility.ItemCompleted` / `Utility.ItemFailed`
//! - a failed item, an item never reached (`Utility.BatchInterrupted`) or a
//!   proxied call whose `Proxy.ProxyExecuted` result is an error gets no
//!   events, since its effects were reverted

use tally_core::ports::RawEvent;

const BATCH_CALLS: &[&str] = &["Utility.batch", "Utility.batch_all", "Utility.force_batch"];
const PROXY_CALL: &str = "Proxy.proxy";

const ITEM_COMPLETED: &str = "Utility.ItemCompleted";
const ITEM_FAILED: &str = "Utility.ItemFailed";
const BATCH_ENDED: &[&str] = &[
    "Utility.BatchCompleted",
    "Utility.BatchCompletedWithErrors",
    "Utility.BatchInterrupted",
];
const PROXY_EXECUTED: &str = "Proxy.ProxyExecuted";

/// A call as submitted, with wrapper calls opened up.
#[derive(Debug, Clone, PartialEq)]
pub enum CallTree {
    Call {
        name: String,
        args: serde_json::Value,
    },
    Batch(Vec<CallTree>),
    Proxy(Box<CallTree>),
}

/// A leaf call with the events emitted in its scope.
#[derive(Debug, Clone)]
pub struct DispatchedCall {
    pub name: String,
    pub args: serde_json::Value,
    pub events: Vec<RawEvent>,
}

impl CallTree {
    /// Build the tree of a top-level call from its qualified name and JSON
    /// arguments.
    pub fn parse(name: String, args: serde_json::Value) -> Self {
        if BATCH_CALLS.contains(&name.as_str()) {
            // A single-element Vec<RuntimeCall> is flattened by the JSON
            // conversion, so a bare object is a batch of one.
            let items = match args.get("calls") {
                Some(serde_json::Value::Array(calls)) => Some(calls.iter().collect::<Vec<_>>()),
                Some(call @ serde_json::Value::Object(_)) => Some(vec![call]),
                _ => None,
            };
            if let Some(items) = items {
                return Self::Batch(items.into_iter().map(Self::from_runtime_call).collect());
            }
        } else if name == PROXY_CALL
            && let Some(call) = args.get("call")
        {
            return Self::Proxy(Box::new(Self::from_runtime_call(call)));
        }

        Self::Call { name, args }
    }

    /// `{"Pallet": {"call_name": args}}` as produced for a `RuntimeCall`.
    ///
    /// Unrecognized shapes become an unnamed call so batch items keep their
    /// position.
    fn from_runtime_call(value: &serde_json::Value) -> Self {
        let parsed = single_entry(value).and_then(|(pallet, inner)| {
            let (call, args) = single_entry(inner)?;
            Some((format!("{}.{}", pallet, call), args.clone()))
        });

        match parsed {
            Some((name, args)) => Self::parse(name, args),
            None => Self::Call {
                name: String::new(),
                args: value.clone(),
            },
        }
    }

    /// Number of batch wrappers in this subtree, each closing with one
    /// `BatchCompleted*` / `BatchInterrupted` event when it runs.
    fn batch_count(&self) -> usize {
        match self {
            Self::Call { .. } => 0,
            Self::Batch(items) => 1 + items.iter().map(Self::batch_count).sum::<usize>(),
            Self::Proxy(inner) => inner.batch_count(),
        }
    }

    /// Flatten into leaf calls in execution order, each with its own events.
    ///
    /// `events` is the full event list of the owning extrinsic.
    pub fn dispatch(self, events: &[RawEvent]) -> Vec<DispatchedCall> {
        let mut out = Vec::new();
        self.assign(events, &mut out);
        out
    }

    fn assign(self, events: &[RawEvent], out: &mut Vec<DispatchedCall>) {
        match self {
            Self::Call { name, args } => out.push(DispatchedCall {
                name,
                args,
                events: events.to_vec(),
            }),
            Self::Proxy(inner) => {
                // The outermost proxy reports last
                let failed = events
                    .iter()
                    .rev()
                    .find(|e| e.name == PROXY_EXECUTED)
                    .is_some_and(|e| e.args.get("result").and_then(|r| r.get("Err")).is_some());
                let scope: &[RawEvent] = if failed { &[] } else { events };
                inner.assign(scope, out);
            }
            Self::Batch(items) => {
                let mut rest = events;
                for item in items {
                    let (scope, remaining) = take_item(&item, rest);
                    rest = remaining;
                    item.assign(scope, out);
                }
            }
        }
    }
}

/// Split the events of the next batch item off `events`.
///
/// Markers of batches nested inside the item are skipped by counting their
/// closing events first.
fn take_item<'a>(item: &CallTree, events: &'a [RawEvent]) -> (&'a [RawEvent], &'a [RawEvent]) {
    let nested = item.batch_count();
    let mut closed = 0;
    let reverted: &[RawEvent] = &[];

    for (i, event) in events.iter().enumerate() {
        let name = event.name.as_str();
        if BATCH_ENDED.contains(&name) {
            closed += 1;
            continue;
        }
        match name {
            ITEM_COMPLETED if closed >= nested => return (&events[..=i], &events[i + 1..]),
            // A failed item is rolled back entirely, so its marker comes first
            ITEM_FAILED if closed >= nested || i == 0 => return (reverted, &events[i + 1..]),
            _ => {}
        }
    }

    // Never executed: the batch was interrupted or the extrinsic failed
    (reverted, reverted)
}

fn single_entry(value: &serde_json::Value) -> Option<(&String, &serde_json::Value)> {
    let obj = value.as_object()?;
    if obj.len() != 1 {
        return None;
    }
    obj.iter().next()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(name: &str, args: serde_json::Value) -> RawEvent {
        RawEvent {
            index: 0,
            name: name.into(),
            args,
            extrinsic_index: Some(1),
        }
    }

    fn transfer(amount: u64) -> RawEvent {
        event("Balances.Transfer", json!({"amount": amount}))
    }

    fn names(calls: &[DispatchedCall]) -> Vec<&str> {
        calls.iter().map(|c| c.name.as_str()).collect()
    }

    fn transfer_call(value: u64) -> serde_json::Value {
        json!({"Balances": {"transfer_keep_alive": {"dest": "0x01", "value": value}}})
    }

    #[test]
    fn test_plain_call_keeps_all_events() {
        let events = vec![event("Balances.Withdraw", json!({})), transfer(5)];
        let calls = CallTree::parse("Balances.transfer".into(), json!({"value": 5})).dispatch(&events);

        assert_eq!(names(&calls), vec!["Balances.transfer"]);
        assert_eq!(calls[0].events.len(), 2);
        assert_eq!(calls[0].args, json!({"value": 5}));
    }

    // Test critique: chaque élément d'un batch ne voit que ses propres événements
    #[test]
    fn test_batch_items_get_their_own_events() {
        let tree = CallTree::parse(
            "Utility.batch_all".into(),
            json!({"calls": [transfer_call(10), transfer_call(20)]}),
        );
        let events = vec![
            event("Balances.Withdraw", json!({})),
            transfer(10),
            event(ITEM_COMPLETED, json!({})),
            transfer(20),
            event(ITEM_COMPLETED, json!({})),
            event("Utility.BatchCompleted", json!({})),
            event("System.ExtrinsicSuccess", json!({})),
        ];

        let calls = tree.dispatch(&events);
        assert_eq!(
            names(&calls),
            vec!["Balances.transfer_keep_alive", "Balances.transfer_keep_alive"]
        );
        assert_eq!(calls[0].args["value"], json!(10));
        assert_eq!(calls[0].events[1].args["amount"], json!(10));
        assert_eq!(calls[1].events.len(), 2);
        assert_eq!(calls[1].events[0].args["amount"], json!(20));
    }

    #[test]
    fn test_single_item_batch_is_recognized() {
        let tree = CallTree::parse("Utility.batch".into(), json!({"calls": transfer_call(7)}));
        assert_eq!(tree, CallTree::Batch(vec![CallTree::Call {
            name: "Balances.transfer_keep_alive".into(),
            args: json!({"dest": "0x01", "value": 7}),
        }]));
    }

    #[test]
    fn test_failed_and_unreached_items_get_no_events() {
        let forced = CallTree::parse(
            "Utility.force_batch".into(),
            json!({"calls": [transfer_call(1), transfer_call(2), transfer_call(3)]}),
        );
        let events = vec![
            transfer(1),
            event(ITEM_COMPLETED, json!({})),
            event(ITEM_FAILED, json!({})),
            transfer(3),
            event(ITEM_COMPLETED, json!({})),
            event("Utility.BatchCompletedWithErrors", json!({})),
        ];
        let calls = forced.dispatch(&events);
        assert_eq!(calls.len(), 3);
        assert!(!calls[0].events.is_empty());
        assert!(calls[1].events.is_empty());
        assert_eq!(calls[2].events[0].args["amount"], json!(3));

        let interrupted = CallTree::parse(
            "Utility.batch".into(),
            json!({"calls": [transfer_call(1), transfer_call(2)]}),
        );
        let events = vec![
            transfer(1),
            event(ITEM_COMPLETED, json!({})),
            event("Utility.BatchInterrupted", json!({"index": 1})),
        ];
        let calls = interrupted.dispatch(&events);
        assert_eq!(calls.len(), 2);
        assert!(calls[1].events.is_empty());
    }

    #[test]
    fn test_nested_batch_markers_are_skipped() {
        let tree = CallTree::parse(
            "Utility.batch".into(),
            json!({"calls": [
                {"Utility": {"batch": {"calls": [transfer_call(1), transfer_call(2)]}}},
                transfer_call(3),
            ]}),
        );
        let events = vec![
            transfer(1),
            event(ITEM_COMPLETED, json!({})),
            transfer(2),
            event(ITEM_COMPLETED, json!({})),
            event("Utility.BatchCompleted", json!({})),
            event(ITEM_COMPLETED, json!({})),
            transfer(3),
            event(ITEM_COMPLETED, json!({})),
            event("Utility.BatchCompleted", json!({})),
        ];

        let calls = tree.dispatch(&events);
        let amounts: Vec<_> = calls.iter().map(|c| c.events[0].args["amount"].clone()).collect();
        assert_eq!(amounts, vec![json!(1), json!(2), json!(3)]);
    }

    #[test]
    fn test_proxy_call_is_unwrapped() {
        let args = json!({"real": "0x02", "force_proxy_type": null, "call": transfer_call(9)});
        let ok = vec![transfer(9), event(PROXY_EXECUTED, json!({"result": {"Ok": []}}))];
        let calls = CallTree::parse("Proxy.proxy".into(), args.clone()).dispatch(&ok);
        assert_eq!(names(&calls), vec!["Balances.transfer_keep_alive"]);
        assert_eq!(calls[0].events.len(), 2);

        let failed = vec![event(PROXY_EXECUTED, json!({"result": {"Err": {"Module": {}}}}))];
        let calls = CallTree::parse("Proxy.proxy".into(), args).dispatch(&failed);
        assert_eq!(calls.len(), 1);
        assert!(calls[0].events.is_empty());
    }

    #[test]
    fn test_unrecognized_item_keeps_position() {
        let tree = CallTree::parse(
            "Utility.batch".into(),
            json!({"calls": ["garbage", transfer_call(2)]}),
        );
        let events = vec![
            event(ITEM_COMPLETED, json!({})),
            transfer(2),
            event(ITEM_COMPLETED, json!({})),
        ];
        let calls = tree.dispatch(&events);
        assert_eq!(names(&calls), vec!["", "Balances.transfer_keep_alive"]);
        assert_eq!(calls[1].events[0].args["amount"], json!(2));
    }
}
