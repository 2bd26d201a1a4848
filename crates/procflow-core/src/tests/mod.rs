mod hierarchy;

use crate::RawRow;
use serde_json::{Value, json};

pub(super) fn rows(value: Value) -> Vec<RawRow> {
    crate::rows_from_json(&value).unwrap()
}

pub(super) fn scenario_rows() -> Vec<RawRow> {
    rows(json!([
        {"L0": "D1", "L0name": "Domain1", "L4": "P1", "L4name": "Step1"},
        {"L0": "D1", "L4": "P2", "L4name": "Step2", "L4Predecessor": "P1", "L4Condition": "ok"}
    ]))
}
