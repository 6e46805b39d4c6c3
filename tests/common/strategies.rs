use proptest::prelude::*;

/// A small status alphabet so generated tables overlap heavily
pub fn status_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("sleep".to_string()),
        Just("awake".to_string()),
        Just("feeding".to_string()),
        Just("fed".to_string()),
        Just("run".to_string()),
        "[a-z][a-z_]{0,11}",
    ]
}

/// `None` is the unset sentinel
pub fn source_strategy() -> impl Strategy<Value = Option<String>> {
    prop::option::weighted(0.85, status_strategy())
}

/// Raw `(source, targets)` rows, each with at least one target
pub fn table_rows_strategy() -> impl Strategy<Value = Vec<(Option<String>, Vec<String>)>> {
    prop::collection::vec(
        (source_strategy(), prop::collection::vec(status_strategy(), 1..4)),
        1..8,
    )
}

/// Valid namespace names
pub fn namespace_name_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z_][a-zA-Z0-9_]{0,31}"
}
