//! Trajectory test library: the built-in playground tests and JSON loading.
//!
//! Golden URLs may carry `[...]` placeholder values. When a run starts at a
//! named checkpoint the brackets are stripped and the bracketed text is used
//! as the literal value to navigate to.

use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use serde_json::json;

use crate::golden::types::{
    CheckpointKind, EndToEndSpec, GoldenCheckpoint, GoldenTest, LibraryError, LibraryResult,
};
use crate::log::{Action, GoldenAction};

/// Task name used in headers of trajectory tests
pub const PLAYGROUND_TASK: &str = "playground";

/// Path every full trajectory run starts from
pub const PLAYGROUND_START_PATH: &str = "/playground";

/// Ordered collection of trajectory tests
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrajectoryLibrary {
    tests: Vec<GoldenTest>,
}

impl TrajectoryLibrary {
    pub fn new(tests: Vec<GoldenTest>) -> LibraryResult<Self> {
        let library = Self { tests };
        library.validate()?;
        Ok(library)
    }

    /// Parse a JSON array of tests
    pub fn from_json_str(json: &str) -> LibraryResult<Self> {
        let tests: Vec<GoldenTest> = serde_json::from_str(json)?;
        Self::new(tests)
    }

    pub fn from_path(path: &Path) -> LibraryResult<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn tests(&self) -> &[GoldenTest] {
        &self.tests
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tests.iter().map(|t| t.name.as_str())
    }

    pub fn get(&self, name: &str) -> LibraryResult<&GoldenTest> {
        self.tests
            .iter()
            .find(|t| t.name == name)
            .ok_or_else(|| LibraryError::UnknownTest(name.to_string()))
    }

    /// Reject libraries the evaluator cannot score unambiguously
    fn validate(&self) -> LibraryResult<()> {
        let mut test_names = HashSet::new();
        for test in &self.tests {
            if !test_names.insert(test.name.as_str()) {
                return Err(LibraryError::Invalid(format!("duplicate test {}", test.name)));
            }
            if test.name.contains(char::is_whitespace) || test.name.contains('/') {
                return Err(LibraryError::Invalid(format!(
                    "test name {:?} may not contain whitespace or '/'",
                    test.name
                )));
            }

            let mut checkpoint_names = HashSet::new();
            for checkpoint in &test.checkpoints {
                if !checkpoint_names.insert(checkpoint.name.as_str()) {
                    return Err(LibraryError::Invalid(format!(
                        "duplicate checkpoint {} in test {}",
                        checkpoint.name, test.name
                    )));
                }
                let task_only = matches!(checkpoint.kind, CheckpointKind::TaskOnly { .. });
                if task_only && checkpoint.full_match_verifier_next_checkpoint.is_none() {
                    return Err(LibraryError::Invalid(format!(
                        "checkpoint {} in test {} lists relevant tasks but has no verifier",
                        checkpoint.name, test.name
                    )));
                }
            }
        }
        Ok(())
    }
}

static BUILTIN: OnceLock<TrajectoryLibrary> = OnceLock::new();

/// Trajectory tests served by the playground frontend
pub fn builtin() -> &'static TrajectoryLibrary {
    BUILTIN.get_or_init(|| TrajectoryLibrary {
        tests: vec![order_test(), add_custom_to_cart_test()],
    })
}

fn golden(component: &str, label: &str) -> GoldenAction {
    GoldenAction::new(Action::new(component, label))
}

fn golden_value(component: &str, label: &str, new_value: &str) -> GoldenAction {
    GoldenAction::new(Action::new(component, label).with_new_value(new_value))
}

fn search_checkpoint() -> GoldenCheckpoint {
    GoldenCheckpoint::new(
        "1_search_for_item",
        PLAYGROUND_START_PATH,
        vec![
            golden("type/text", "Search items"),
            golden("click/iconbutton", "Search"),
        ],
    )
    .verified_by("/playground/search?query=[]")
}

fn order_test() -> GoldenTest {
    GoldenTest {
        name: "order".to_string(),
        goal: "Please order a MacBook Pro M3 chip without additional customizations to be delivered \
               to John Doe at 123 Main Street, Cambridge, MA 02138"
            .to_string(),
        checkpoints: vec![
            search_checkpoint(),
            GoldenCheckpoint::new(
                "2_select_item_from_search",
                "/playground/search?query=[MacBook Pro M3 chip]",
                vec![golden("click/link", "2023 MacBook Pro - M3 chip, 14-inch").with_untracked("search/appropriate")],
            )
            .verified_by("/playground/product/1"),
            GoldenCheckpoint::new(
                "3_purchase_item",
                "/playground/product/1",
                vec![golden("click/button", "Buy now")],
            )
            .verified_by(r#"/playground/checkout?cart={"id":"1","customizations":{"memory":"8GB","storage":"512GB"},"price":1599}"#),
            GoldenCheckpoint::new(
                "4_fill_shipping_info",
                r#"/playground/checkout?cart=[{"id":"1","customizations":{"memory":"8GB","storage":"512GB"},"price":1599}]"#,
                vec![
                    golden_value("type/text", "First name", "John"),
                    golden_value("type/text", "Last name", "Doe"),
                    golden_value("type/text", "Street address", "123 Main Street"),
                    golden_value("type/text", "City", "Cambridge"),
                    golden_value("select/select", "State", "MA"),
                    golden_value("type/text", "Zip code", "02138"),
                    golden("click/button", "Order"),
                ],
            )
            .task_only(vec![golden("fill/complex", "Shipping info")])
            .verified_by(
                r#"/playground/thanks?cart=[]&location={"city":"Cambridge","firstName":"John","lastName":"Doe","state":"MA","streetAddress":"123 Main Street","zipCode":"02138"}"#,
            ),
        ],
        end_to_end: Some(EndToEndSpec {
            path: "/playground/thanks".to_string(),
            params: json!({
                "cart": {
                    "customizations": {"memory": "8GB", "storage": "512GB"},
                    "id": "1",
                },
                "location": {
                    "city": "Cambridge",
                    "firstName": "John",
                    "lastName": "Doe",
                    "state": "MA",
                    "streetAddress": "123 Main Street",
                    "zipCode": "02138",
                },
            }),
        }),
    }
}

fn add_custom_to_cart_test() -> GoldenTest {
    GoldenTest {
        name: "add_custom_to_cart".to_string(),
        goal: "Please add a Macbook Pro with M3 Pro Chip to the cart with highest-tier customizations.".to_string(),
        checkpoints: vec![
            search_checkpoint(),
            GoldenCheckpoint::new(
                "2_select_item_from_search",
                "/playground/search?query=[Macbook Pro M3 Pro Chip]",
                vec![golden("click/link", "2023 MacBook Pro - M3 Pro chip, 14-inch").with_untracked("search/appropriate")],
            )
            .verified_by("/playground/product/2"),
            GoldenCheckpoint::new(
                "3_select_customizations",
                "/playground/product/2",
                vec![golden("click/button", "36GB (+400.00)"), golden("click/button", "2TB (+600.00)")],
            )
            .task_only(vec![golden("fill/basic", "Customizations")])
            .verified_by(r#"/playground/checkout?cart={"id":"2","customizations":{"memory":"36GB","storage":"2TB"},"price":2999}"#),
        ],
        end_to_end: Some(EndToEndSpec {
            path: "/playground/checkout".to_string(),
            params: json!({
                "cart": {
                    "customizations": {"memory": "36GB", "storage": "2TB"},
                    "id": "2",
                    "price": 2999,
                },
            }),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_shape() {
        let library = builtin();
        assert_eq!(library.names().collect::<Vec<_>>(), vec!["order", "add_custom_to_cart"]);

        let order = library.get("order").unwrap();
        assert_eq!(order.checkpoints.len(), 4);
        assert!(order.checkpoints[3].relevant_tasks().is_some());
        assert_eq!(order.end_to_end.as_ref().unwrap().path, "/playground/thanks");

        let cart = library.get("add_custom_to_cart").unwrap();
        assert_eq!(cart.checkpoints.len(), 3);
        assert_eq!(cart.checkpoints[2].scored_actions()[0].action.component, "fill/basic");
    }

    #[test]
    fn test_builtin_validates() {
        assert!(TrajectoryLibrary::new(builtin().tests().to_vec()).is_ok());
    }

    #[test]
    fn test_unknown_names() {
        let library = builtin();
        assert!(matches!(library.get("refund"), Err(LibraryError::UnknownTest(_))));
        let order = library.get("order").unwrap();
        assert!(matches!(
            order.checkpoint_index("5_pay"),
            Err(LibraryError::UnknownCheckpoint { .. })
        ));
    }

    #[test]
    fn test_golden_slice() {
        let order = builtin().get("order").unwrap();
        assert_eq!(order.golden_slice(None, false).unwrap().len(), 4);
        let from_third = order.golden_slice(Some("3_purchase_item"), false).unwrap();
        assert_eq!(from_third.len(), 2);
        assert_eq!(from_third[0].name, "3_purchase_item");
        let only = order.golden_slice(Some("2_select_item_from_search"), true).unwrap();
        assert_eq!(only.len(), 1);
        assert_eq!(only[0].name, "2_select_item_from_search");
    }

    #[test]
    fn test_json_roundtrip_and_validation() {
        let json = serde_json::to_string(builtin().tests()).unwrap();
        let loaded = TrajectoryLibrary::from_json_str(&json).unwrap();
        assert_eq!(&loaded, builtin());

        let json = r#"[{"name":"t","goal":"g","checkpoints":[
            {"name":"a","url":"/a","actions":[{"component":"click/button","label":"Go"}]},
            {"name":"a","url":"/b"}
        ]}]"#;
        assert!(matches!(TrajectoryLibrary::from_json_str(json), Err(LibraryError::Invalid(_))));

        let json = r#"[{"name":"t","goal":"g","checkpoints":[
            {"name":"a","url":"/a","kind":{"type":"task_only","relevant_tasks":[]}}
        ]}]"#;
        assert!(matches!(TrajectoryLibrary::from_json_str(json), Err(LibraryError::Invalid(_))));

        assert!(matches!(TrajectoryLibrary::from_json_str("{"), Err(LibraryError::Json(_))));
    }

    #[test]
    fn test_json_defaults() {
        let json = r#"[{"name":"t","goal":"g","checkpoints":[
            {"name":"a","url":"/a","actions":[{"component":"type/text","label":"Name","new_value":"Jo"}]}
        ]}]"#;
        let library = TrajectoryLibrary::from_json_str(json).unwrap();
        let checkpoint = &library.get("t").unwrap().checkpoints[0];
        assert_eq!(checkpoint.kind, CheckpointKind::Sequential);
        assert_eq!(checkpoint.actions[0].action.new_value.as_deref(), Some("Jo"));
        assert!(library.get("t").unwrap().end_to_end.is_none());
    }
}
