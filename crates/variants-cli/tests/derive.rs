//! Integration tests for catalog loading and plan execution.

use std::path::PathBuf;

use serde_json::json;
use variants_cli::catalog::Catalog;
use variants_cli::plan::{Plan, derive};
use variants_cli::report::{type_reports, variant_reports};
use variants_model::TypeExpr;

fn demo(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../demos")
        .join(name)
}

fn demo_catalog() -> Catalog {
    Catalog::load(&demo("catalog.json")).unwrap()
}

#[test]
fn catalog_resolves_nested_records() {
    let catalog = demo_catalog();
    assert_eq!(catalog.len(), 2);
    let address = catalog.get("Address").unwrap();
    let user = catalog.get("User").unwrap();
    assert_eq!(
        user.field("addresses").unwrap().ty,
        TypeExpr::list(TypeExpr::record(address))
    );
    assert!(!user.field("addresses").unwrap().is_required());
    assert_eq!(user.doc(), Some("An account holder."));
}

#[test]
fn catalog_rejects_forward_references() {
    let err = Catalog::from_json(
        r#"{"types": [
            {"name": "Person", "fields": [{"name": "home", "type": "Address"}]},
            {"name": "Address", "fields": [{"name": "city", "type": "str"}]}
        ]}"#,
    )
    .unwrap_err();
    assert!(format!("{err:#}").contains("referenced before it is declared"));
}

#[test]
fn catalog_rejects_duplicate_fields() {
    let err = Catalog::from_json(
        r#"{"types": [{"name": "A", "fields": [
            {"name": "x", "type": "int"},
            {"name": "x", "type": "str"}
        ]}]}"#,
    )
    .unwrap_err();
    assert!(format!("{err:#}").contains("type A"));
}

#[test]
fn demo_plan_derives_in_catalog_order() {
    let catalog = demo_catalog();
    let plan = Plan::load(&demo("plan.json")).unwrap();
    let derivation = derive(&catalog, &plan).unwrap();

    let names: Vec<&str> = derivation
        .variants
        .iter()
        .map(|derived| derived.ty.name())
        .collect();
    assert_eq!(
        names,
        vec!["AddressInput", "UserInput", "UserUpdate", "PublicUser"]
    );

    let user_input = &derivation.variants[1].ty;
    insta::assert_snapshot!(user_input.to_string().trim_end(), @r#"
    UserInput
      "An account holder."
      name: str? = null [max_length=50]
      email: str [#pii]
      password: str
      addresses: list<AddressInput> = list()
      status: literal("active") | literal("disabled") = "active"
    "#);

    let user = catalog.get("User").unwrap();
    let directory = &derivation.directory;
    assert_eq!(directory.variants(user).unwrap().len(), 3);
    assert!(directory.attribute(user, "_Input").is_some());
    assert!(directory.attribute(user, "_Output").is_none());
}

#[test]
fn update_and_output_variants() {
    let catalog = demo_catalog();
    let plan = Plan::load(&demo("plan.json")).unwrap();
    let derivation = derive(&catalog, &plan).unwrap();
    let reports = serde_json::to_value(variant_reports(&derivation.variants)).unwrap();

    let update = &reports[2];
    assert_eq!(update["type"]["name"], "UserUpdate");
    let fields = update["type"]["fields"].as_array().unwrap();
    assert!(fields.iter().all(|field| field["required"] == json!(false)));
    assert_eq!(fields[1], json!({
        "name": "email",
        "type": "str?",
        "required": false,
        "default": null,
        "markers": ["#pii"]
    }));

    let output = &reports[3];
    assert_eq!(output["variant"], "Output");
    let names: Vec<&str> = output["type"]["fields"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|field| field["name"].as_str())
        .collect();
    assert_eq!(names, vec!["id", "name", "contact", "addresses", "status"]);

    assert_eq!(reports[1]["attributes"], json!({"table": "users"}));
}

#[test]
fn plan_errors_carry_context() {
    let catalog = demo_catalog();
    let plan = Plan::from_json(
        r#"{"derive": [{"type": "User", "variants": [
            {"name": "Update", "steps": [{"extract": {"variant": "Input"}}, {"build": {}}]}
        ]}]}"#,
    )
    .unwrap();
    let err = derive(&catalog, &plan).unwrap_err();
    let message = format!("{err:#}");
    assert!(message.contains("derive User.Update"));
    assert!(message.contains("no variant named \"Input\""));
}

#[test]
fn unbuilt_variants_are_reported() {
    let catalog = demo_catalog();
    let plan = Plan::from_json(
        r#"{"derive": [{"type": "Address", "variants": [
            {"name": "Draft", "steps": [{"filter": {"exclude": ["id"]}}]}
        ]}]}"#,
    )
    .unwrap();
    let err = derive(&catalog, &plan).unwrap_err();
    assert!(err.to_string().contains("never built"));
}

#[test]
fn unknown_plan_types_fail() {
    let plan = Plan::from_json(r#"{"derive": [{"type": "Ghost", "variants": []}]}"#).unwrap();
    assert!(derive(&demo_catalog(), &plan).is_err());
}

#[test]
fn inspect_report_lists_fields() {
    let reports = serde_json::to_value(type_reports(demo_catalog().types())).unwrap();
    assert_eq!(reports[0]["name"], "Address");
    assert_eq!(reports[1]["config"], json!({"title": "User"}));
    assert_eq!(
        reports[1]["fields"][4],
        json!({
            "name": "addresses",
            "type": "list<Address>",
            "required": false,
            "default_factory": "list"
        })
    );
    assert_eq!(reports[0]["fields"][0]["markers"], json!(["exclude(input)"]));
}
