use anyhow::Result;
use rillquery::testing::MockTransport;
use rillquery::{CountMode, FilterKind, Operation, SelectOptions, SortDirection};
use serde_json::json;

#[tokio::test]
async fn select_round_trip_body() -> Result<()> {
    let mock = MockTransport::new();
    let client = mock.client();

    client
        .from("users")
        .select("id,email")
        .eq("active", true)
        .order("email", SortDirection::Asc)
        .limit(10)
        .await?;

    let request = mock.last_request().expect("request sent");
    assert_eq!(
        serde_json::to_value(&request)?,
        json!({
            "collection": "users",
            "operation": "select",
            "data": null,
            "filters": [{"type": "eq", "column": "active", "value": true}],
            "options": {
                "columns": "id,email",
                "order": {"column": "email", "options": {"ascending": true}},
                "limit": 10,
                "single": false,
                "maybeSingle": false
            }
        })
    );
    Ok(())
}

#[test]
fn filters_keep_call_order() {
    let client = MockTransport::new().client();
    let wire = client.from("t").eq("a", 1).eq("b", 2).to_wire();

    assert_eq!(
        serde_json::to_value(&wire.filters).unwrap(),
        json!([
            {"type": "eq", "column": "a", "value": 1},
            {"type": "eq", "column": "b", "value": 2}
        ])
    );
}

#[test]
fn default_query_reads_everything_with_many_cardinality() {
    let client = MockTransport::new().client();
    let wire = client.from("t").to_wire();

    assert_eq!(wire.operation, Operation::Select);
    assert_eq!(wire.options.columns, "*");
    assert!(!wire.options.single);
    assert!(!wire.options.maybe_single);
    assert_eq!(wire.data, None);
}

#[test]
fn last_operation_call_wins() {
    let client = MockTransport::new().client();
    let query = client.from("t").select("*").insert(&json!({"x": 1}));

    assert_eq!(query.descriptor().operation(), Some(Operation::Insert));
    let wire = query.to_wire();
    assert_eq!(wire.operation, Operation::Insert);
    assert_eq!(wire.data, Some(json!({"x": 1})));
}

#[test]
fn insert_then_update_keeps_update_payload() {
    let client = MockTransport::new().client();
    let wire = client
        .from("t")
        .insert(&json!({"x": 1}))
        .update(&json!({"x": 2}))
        .eq("id", 9)
        .to_wire();

    assert_eq!(wire.operation, Operation::Update);
    assert_eq!(wire.data, Some(json!({"x": 2})));
    assert_eq!(wire.filters.len(), 1);
}

#[test]
fn delete_clears_payload() {
    let client = MockTransport::new().client();
    let wire = client
        .from("t")
        .insert(&json!({"x": 1}))
        .delete()
        .eq("id", 1)
        .to_wire();

    assert_eq!(wire.operation, Operation::Delete);
    assert_eq!(wire.data, None);
}

#[test]
fn select_after_filters_keeps_them() {
    let client = MockTransport::new().client();
    let wire = client.from("t").gt("age", 21).select("name").to_wire();

    assert_eq!(wire.filters.len(), 1);
    assert_eq!(wire.options.columns, "name");
}

#[test]
fn later_order_and_limit_replace_earlier_ones() {
    let client = MockTransport::new().client();
    let wire = client
        .from("t")
        .order("a", SortDirection::Asc)
        .limit(5)
        .order("b", SortDirection::Desc)
        .limit(2)
        .to_wire();

    assert_eq!(
        serde_json::to_value(&wire.options.order).unwrap(),
        json!({"column": "b", "options": {"ascending": false}})
    );
    assert_eq!(wire.options.limit, Some(2));
}

#[test]
fn full_filter_vocabulary_serializes() {
    let client = MockTransport::new().client();
    let wire = client
        .from("t")
        .neq("a", "x")
        .gte("b", 1.5)
        .lt("c", 3)
        .lte("d", 4)
        .is("e", serde_json::Value::Null)
        .not("f", FilterKind::Eq, "archived")
        .r#in("g", Vec::<i64>::new())
        .to_wire();

    assert_eq!(
        serde_json::to_value(&wire.filters).unwrap(),
        json!([
            {"type": "neq", "column": "a", "value": "x"},
            {"type": "gte", "column": "b", "value": 1.5},
            {"type": "lt", "column": "c", "value": 3},
            {"type": "lte", "column": "d", "value": 4},
            {"type": "is", "column": "e", "value": null},
            {"type": "not", "column": "f", "value": {"operator": "eq", "value": "archived"}},
            {"type": "in", "column": "g", "value": []}
        ])
    );
}

#[tokio::test]
async fn empty_in_set_still_dispatches() -> Result<()> {
    let mock = MockTransport::new();
    let client = mock.client();

    let res = client.from("t").r#in("id", Vec::<i64>::new()).await?;

    assert_eq!(mock.calls(), 1);
    assert_eq!(res.data, Some(json!([])));
    Ok(())
}

#[test]
fn count_mode_is_sent_only_when_requested() {
    let client = MockTransport::new().client();
    let plain = serde_json::to_value(client.from("t").select("*").to_wire()).unwrap();
    assert!(plain["options"].get("count").is_none());

    let counted = client
        .from("t")
        .select_with(
            "id",
            SelectOptions {
                count: Some(CountMode::Exact),
            },
        )
        .to_wire();
    assert_eq!(
        serde_json::to_value(&counted.options).unwrap()["count"],
        json!("exact")
    );
}

#[test]
fn filter_if_skips_false_conditions() {
    let client = MockTransport::new().client();
    let search: Option<&str> = None;
    let wire = client
        .from("t")
        .filter_if(search.is_some(), || {
            rillquery::Predicate::eq("name", search.unwrap_or_default())
        })
        .filter_if(true, || rillquery::Predicate::is_null("deleted_at"))
        .to_wire();

    assert_eq!(wire.filters.len(), 1);
    assert_eq!(wire.filters[0].column(), "deleted_at");
}
