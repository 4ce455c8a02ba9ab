//! Indexed events attached to delivered transactions.

use sc_06_execution::TrxReceipt;
use serde::Serialize;
use shared_types::to_hex;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct EventAttribute {
    pub key: String,
    pub value: String,
    pub index: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Event {
    pub kind: String,
    pub attributes: Vec<EventAttribute>,
}

impl Event {
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.key == key)
            .map(|a| a.value.as_str())
    }
}

/// The `tx` event: type, sender, receiver and the sender/receiver pair.
pub fn tx_event(receipt: &TrxReceipt) -> Event {
    let sender = to_hex(&receipt.from);
    let receiver = to_hex(&receipt.to);
    let attr = |key: &str, value: String| EventAttribute {
        key: key.to_string(),
        value,
        index: true,
    };
    Event {
        kind: "tx".to_string(),
        attributes: vec![
            attr("type", receipt.kind.as_str().to_string()),
            attr("addrpair", format!("{sender}{receiver}")),
            attr("sender", sender),
            attr("receiver", receiver),
        ],
    }
}
