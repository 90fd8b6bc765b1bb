//! Individual-component tests: one widget per page, scored on a flat action list.

use std::sync::OnceLock;

use serde_json::json;

use crate::golden::expect::{ActionPattern, Expectation, Matcher};
use crate::golden::types::{LibraryError, LibraryResult};

/// Variant name used when a component test has only one
pub const DEFAULT_VARIANT: &str = "default";

/// One goal against one component page
#[derive(Debug, Clone)]
pub struct ComponentTest {
    /// Variant name, `default` unless the page has several goals
    pub name: String,

    /// Instruction handed to the agent
    pub goal: String,

    /// What the logged actions must show
    pub expectation: Expectation,

    /// Form payload the final `SUBMIT` must carry; when set it decides
    /// pass/fail and the expectation is reported as the process score
    pub submission: Option<serde_json::Value>,
}

impl ComponentTest {
    fn new(name: &str, goal: &str, expectation: Expectation) -> Self {
        Self {
            name: name.to_string(),
            goal: goal.to_string(),
            expectation,
            submission: None,
        }
    }

    fn with_submission(mut self, submission: serde_json::Value) -> Self {
        self.submission = Some(submission);
        self
    }
}

/// All variants served by one `/ind/<task>?test=<test>` page
#[derive(Debug, Clone)]
pub struct ComponentGroup {
    pub task: String,
    pub test: String,
    pub variants: Vec<ComponentTest>,
}

impl ComponentGroup {
    fn new(task: &str, test: &str, variants: Vec<ComponentTest>) -> Self {
        Self {
            task: task.to_string(),
            test: test.to_string(),
            variants,
        }
    }

    /// Page the agent is pointed at
    pub fn url(&self, port: u16) -> String {
        format!("http://localhost:{}/ind/{}?test={}", port, self.task, self.test)
    }

    pub fn variant(&self, name: &str) -> LibraryResult<&ComponentTest> {
        self.variants
            .iter()
            .find(|v| v.name == name)
            .ok_or_else(|| LibraryError::UnknownComponentTest(format!("{}/{}/{}", self.task, self.test, name)))
    }
}

/// Component tests in task order
#[derive(Debug, Clone, Default)]
pub struct ComponentLibrary {
    groups: Vec<ComponentGroup>,
}

impl ComponentLibrary {
    pub fn new(groups: Vec<ComponentGroup>) -> Self {
        Self { groups }
    }

    pub fn groups(&self) -> &[ComponentGroup] {
        &self.groups
    }

    /// Task names in library order, without duplicates
    pub fn tasks(&self) -> Vec<&str> {
        let mut tasks: Vec<&str> = Vec::new();
        for group in &self.groups {
            if !tasks.contains(&group.task.as_str()) {
                tasks.push(&group.task);
            }
        }
        tasks
    }

    pub fn for_task(&self, task: &str) -> LibraryResult<Vec<&ComponentGroup>> {
        let groups: Vec<&ComponentGroup> = self.groups.iter().filter(|g| g.task == task).collect();
        if groups.is_empty() {
            return Err(LibraryError::UnknownComponentTest(task.to_string()));
        }
        Ok(groups)
    }

    pub fn group(&self, task: &str, test: &str) -> LibraryResult<&ComponentGroup> {
        self.groups
            .iter()
            .find(|g| g.task == task && g.test == test)
            .ok_or_else(|| LibraryError::UnknownComponentTest(format!("{}/{}", task, test)))
    }

    pub fn variant(&self, task: &str, test: &str, name: &str) -> LibraryResult<&ComponentTest> {
        self.group(task, test)?.variant(name)
    }
}

static BUILTIN: OnceLock<ComponentLibrary> = OnceLock::new();

/// Component tests served by the playground frontend
pub fn builtin() -> &'static ComponentLibrary {
    BUILTIN.get_or_init(build_builtin)
}

fn exact(pattern: ActionPattern) -> Matcher {
    Matcher::exact(pattern)
}

fn single(pattern: ActionPattern) -> Expectation {
    Expectation::Ordered(vec![exact(pattern)])
}

fn typed(label: &str, value: &str) -> Matcher {
    exact(ActionPattern::component("type/text").label(label).new_value(value))
}

fn build_builtin() -> ComponentLibrary {
    let checked = || exact(ActionPattern::component("select/checkbox").new_value("true"));

    ComponentLibrary::new(vec![
        ComponentGroup::new(
            "click",
            "button",
            vec![ComponentTest::new(
                DEFAULT_VARIANT,
                "Click the button",
                single(ActionPattern::component("click/button")),
            )],
        ),
        ComponentGroup::new(
            "click",
            "confirmbutton",
            vec![ComponentTest::new(
                DEFAULT_VARIANT,
                "Delete the item",
                single(ActionPattern::component("click/confirmbutton")),
            )],
        ),
        ComponentGroup::new(
            "click",
            "iconbutton",
            vec![ComponentTest::new(
                DEFAULT_VARIANT,
                "Delete the item",
                single(ActionPattern::component("click/iconbutton")),
            )],
        ),
        ComponentGroup::new(
            "click",
            "link",
            vec![ComponentTest::new(
                DEFAULT_VARIANT,
                "Click the link",
                single(ActionPattern::component("click/link")),
            )],
        ),
        ComponentGroup::new(
            "click",
            "slider",
            vec![
                ComponentTest::new(
                    "max",
                    "Adjust the volume to be the maximum",
                    single(ActionPattern::component("click/slider").new_value("100")),
                ),
                ComponentTest::new(
                    "min",
                    "Adjust the volume to be the minimum",
                    single(ActionPattern::component("click/slider").new_value("0")),
                ),
                ComponentTest::new(
                    "louder",
                    "Make the volume louder",
                    Expectation::Ordered(vec![Matcher::all(vec![
                        exact(ActionPattern::component("click/slider")),
                        Matcher::compare_values("new > old", |new, old| new > old),
                    ])]),
                ),
                ComponentTest::new(
                    "quieter",
                    "Make the volume quieter",
                    Expectation::Ordered(vec![Matcher::all(vec![
                        exact(ActionPattern::component("click/slider")),
                        Matcher::compare_values("new < old", |new, old| new < old),
                    ])]),
                ),
            ],
        ),
        ComponentGroup::new(
            "click",
            "snackbar",
            vec![ComponentTest::new(
                DEFAULT_VARIANT,
                "Dismiss the notification",
                single(
                    ActionPattern::component("click/snackbar")
                        .new_value("closed")
                        .old_value("open"),
                ),
            )],
        ),
        ComponentGroup::new(
            "click",
            "switch",
            vec![
                ComponentTest::new(
                    "on-from-off",
                    "Turn on do not disturb",
                    single(ActionPattern::component("click/switch").new_value("true")),
                ),
                ComponentTest::new("off-from-off", "Turn off do not disturb", Expectation::NoActions),
            ],
        ),
        ComponentGroup::new(
            "click",
            "dropdownmenu",
            vec![ComponentTest::new(
                DEFAULT_VARIANT,
                "Open the menu",
                single(ActionPattern::component("click/iconbutton").label("Menu")),
            )],
        ),
        ComponentGroup::new(
            "type",
            "text",
            vec![ComponentTest::new(
                DEFAULT_VARIANT,
                "Enter the name John",
                single(ActionPattern::component("type/text").new_value("John")),
            )],
        ),
        ComponentGroup::new(
            "type",
            "date",
            vec![ComponentTest::new(
                DEFAULT_VARIANT,
                "Enter the date April 3rd, 2024",
                Expectation::Ordered(vec![Matcher::all(vec![
                    exact(ActionPattern::component("type/date")),
                    Matcher::new_value_contains("03 Apr 2024"),
                ])]),
            )],
        ),
        ComponentGroup::new(
            "type",
            "phone",
            vec![ComponentTest::new(
                DEFAULT_VARIANT,
                "Please enter 617-495-1000",
                single(ActionPattern::component("type/phone").new_value("(617) 495-1000")),
            )],
        ),
        ComponentGroup::new(
            "select",
            "select",
            vec![ComponentTest::new(
                DEFAULT_VARIANT,
                "Select Canada",
                single(ActionPattern::component("select/select").new_value("Canada")),
            )],
        ),
        ComponentGroup::new(
            "select",
            "checkbox",
            vec![ComponentTest::new(
                DEFAULT_VARIANT,
                "Please accept the terms and conditions",
                single(ActionPattern::component("select/checkbox").new_value("true")),
            )],
        ),
        ComponentGroup::new(
            "select",
            "multicheck",
            vec![ComponentTest::new(
                DEFAULT_VARIANT,
                "Please accept the terms and conditions and privacy policy",
                Expectation::Unordered(vec![
                    Matcher::all(vec![checked(), Matcher::label_contains("terms and conditions")]),
                    Matcher::all(vec![checked(), Matcher::label_contains("privacy policy")]),
                ]),
            )],
        ),
        ComponentGroup::new(
            "find",
            "finddialog",
            vec![ComponentTest::new(
                DEFAULT_VARIANT,
                "In what year was the company founded? Enter the year as the answer",
                Expectation::AtLeastOne(typed("Answer", "2032")),
            )],
        ),
        ComponentGroup::new(
            "filter",
            "gridfilter",
            vec![ComponentTest::new(
                DEFAULT_VARIANT,
                "Filter the orders to only show those shipped to the USA",
                Expectation::AtLeastOne(Matcher::all(vec![
                    exact(ActionPattern::component("click/gridfilter")),
                    Matcher::new_value_json("country contains USA", filters_country_usa),
                ])),
            )],
        ),
        ComponentGroup::new(
            "fill",
            "basicform",
            vec![
                ComponentTest::new(
                    DEFAULT_VARIANT,
                    "Submit the form for John Doe with the email johndoe@gmail.com",
                    Expectation::Ordered(vec![
                        typed("First name", "John"),
                        typed("Last name", "Doe"),
                        typed("Email", "johndoe@gmail.com"),
                        exact(ActionPattern::component("click/button").label("Submit")),
                    ]),
                )
                .with_submission(json!({
                    "email": "johndoe@gmail.com",
                    "firstName": "John",
                    "lastName": "Doe",
                })),
            ],
        ),
        ComponentGroup::new(
            "fill",
            "complexform",
            vec![
                ComponentTest::new(
                    DEFAULT_VARIANT,
                    "Submit the form for John Doe (johndoe@gmail.com, (617) 000-0000), living at \
                     123 Main St, Cambridge, MA 02138, born January 1st, 2000",
                    Expectation::Ordered(vec![
                        typed("First name", "John"),
                        typed("Last name", "Doe"),
                        typed("Email", "johndoe@gmail.com"),
                        exact(
                            ActionPattern::component("type/phone")
                                .label("Phone number")
                                .new_value("(617) 000-0000"),
                        ),
                        typed("Street address", "123 Main St"),
                        typed("City", "Cambridge"),
                        exact(ActionPattern::component("select/select").label("State").new_value("MA")),
                        typed("Zip code", "02138"),
                        exact(ActionPattern::component("type/date").label("Birthday")),
                        exact(ActionPattern::component("click/button").label("Submit")),
                    ]),
                )
                .with_submission(json!({
                    "birthday": "Sat, 01 Jan 2000 05:00:00 GMT",
                    "city": "Cambridge",
                    "email": "johndoe@gmail.com",
                    "firstName": "John",
                    "lastName": "Doe",
                    "phoneNumber": "(617) 000-0000",
                    "state": "MA",
                    "streetAddress": "123 Main St",
                    "zipCode": "02138",
                })),
            ],
        ),
    ])
}

/// A grid filter model with a `country contains USA` item
fn filters_country_usa(model: &serde_json::Value) -> bool {
    model.as_array().is_some_and(|items| {
        items.iter().any(|item| {
            item["field"] == "country" && item["operator"] == "contains" && item["value"] == "USA"
        })
    })
}
