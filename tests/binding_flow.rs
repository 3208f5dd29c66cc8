//! End-to-end binding scenarios for the model engine.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::{Value, json};

use trama::catalog::{MethodCatalog, MethodLayer, ModelRegistry, ModelSpec};
use trama::domain::args::ModelArgs;
use trama::domain::error::BindError;
use trama::model::{BindScope, Binder, Model};

#[derive(Clone, Default)]
struct Spies {
    content: Arc<AtomicUsize>,
    after: Arc<AtomicUsize>,
    secret: Arc<AtomicUsize>,
}

struct Page {
    spies: Spies,
}

impl Model for Page {
    fn invoke(
        &mut self,
        method: &str,
        scope: &mut BindScope<'_>,
    ) -> Result<Option<Value>, BindError> {
        match method {
            "bind_content" => {
                self.spies.content.fetch_add(1, Ordering::SeqCst);
                Ok(Some(json!({"title": "Hello"})))
            }
            "bind_footer" => {
                let args = ModelArgs::from_value(json!({"variable": "x"}))?;
                scope.bind_sub("Footer", args)?;
                Ok(None)
            }
            "bind_stop" => {
                scope.bind_sub("Halting", ModelArgs::new())?;
                Ok(None)
            }
            "bind_after" => {
                self.spies.after.fetch_add(1, Ordering::SeqCst);
                Ok(Some(json!(true)))
            }
            "bind_secret" => {
                self.spies.secret.fetch_add(1, Ordering::SeqCst);
                Ok(Some(json!({"draft": true})))
            }
            "bind_regions" => {
                let left = ModelArgs::from_value(json!({"variable": "left"}))?;
                let right = ModelArgs::from_value(json!({"variable": "right"}))?;
                scope.bind_sub_as("Footer", "FooterLeft", left)?;
                scope.bind_sub_as("Footer", "FooterRight", right)?;
                Ok(None)
            }
            "bind_meta" => {
                scope.bind("meta", json!({"a": 1}))?;
                scope.bind("meta", json!({"b": 2}))?;
                scope.bind_to("Sidebar", "promo", json!("springtime"))?;
                Ok(None)
            }
            other => Err(BindError::unknown_method("Page", other)),
        }
    }
}

struct Footer;

impl Model for Footer {
    fn invoke(
        &mut self,
        method: &str,
        scope: &mut BindScope<'_>,
    ) -> Result<Option<Value>, BindError> {
        match method {
            "bind_links" => {
                let variable = scope.args().get("variable").cloned().unwrap_or(Value::Null);
                Ok(Some(json!({"variable": variable})))
            }
            "bind_social" => {
                scope.bind_sub("Social", ModelArgs::new())?;
                Ok(None)
            }
            other => Err(BindError::unknown_method("Footer", other)),
        }
    }
}

struct Social;

impl Model for Social {
    fn invoke(
        &mut self,
        method: &str,
        scope: &mut BindScope<'_>,
    ) -> Result<Option<Value>, BindError> {
        match method {
            "bind_icons" => Ok(Some(json!({
                "count": 3,
                "parents": scope.ancestors(),
            }))),
            other => Err(BindError::unknown_method("Social", other)),
        }
    }
}

struct Halting;

impl Model for Halting {
    fn invoke(
        &mut self,
        method: &str,
        scope: &mut BindScope<'_>,
    ) -> Result<Option<Value>, BindError> {
        match method {
            "bind_halt" => {
                scope.terminate();
                Ok(None)
            }
            other => Err(BindError::unknown_method("Halting", other)),
        }
    }
}

fn page_spec(spies: &Spies, methods: &[&'static str]) -> ModelSpec {
    let spies = spies.clone();
    let mut layer = MethodLayer::new("Page");
    for &method in methods {
        layer = match method {
            "bind_secret" => layer.restricted(method),
            _ => layer.public_zero(method),
        };
    }
    ModelSpec::new("Page", move |_args| {
        Box::new(Page {
            spies: spies.clone(),
        })
    })
    .catalog(MethodCatalog::new().layer(layer))
}

fn footer_spec(methods: &[&'static str]) -> ModelSpec {
    let mut layer = MethodLayer::new("Footer");
    for &method in methods {
        layer = layer.public_zero(method);
    }
    ModelSpec::new("Footer", |_args| Box::new(Footer))
        .catalog(MethodCatalog::new().layer(layer))
}

fn social_spec() -> ModelSpec {
    ModelSpec::new("Social", |_args| Box::new(Social))
        .catalog(MethodCatalog::new().layer(MethodLayer::new("Social").public_zero("bind_icons")))
}

fn halting_spec() -> ModelSpec {
    ModelSpec::new("Halting", |_args| Box::new(Halting))
        .catalog(MethodCatalog::new().layer(MethodLayer::new("Halting").public_zero("bind_halt")))
}

fn binder(registry: ModelRegistry) -> Binder {
    Binder::builder(registry).build()
}

#[test]
fn fetch_merges_method_results_under_derived_keys() {
    let spies = Spies::default();
    let registry = ModelRegistry::builder()
        .register(page_spec(&spies, &["bind_content"]))
        .build()
        .unwrap();
    let binder = binder(registry);

    let result = binder.fetch("Page", ModelArgs::new()).unwrap();
    assert_eq!(result.tree, json!({"Page": {"content": {"title": "Hello"}}}));
    assert!(!result.terminated);
}

#[test]
fn uncached_method_recomputes_on_every_fetch() {
    let spies = Spies::default();
    let registry = ModelRegistry::builder()
        .register(page_spec(&spies, &["bind_content"]))
        .build()
        .unwrap();
    let binder = binder(registry);

    binder.fetch("Page", ModelArgs::new()).unwrap();
    binder.fetch("Page", ModelArgs::new()).unwrap();
    assert_eq!(spies.content.load(Ordering::SeqCst), 2);
}

#[test]
fn bind_sub_from_root_lands_top_level() {
    let spies = Spies::default();
    let registry = ModelRegistry::builder()
        .register(page_spec(&spies, &["bind_content", "bind_footer"]))
        .register(footer_spec(&["bind_links"]))
        .build()
        .unwrap();
    let binder = binder(registry);

    let result = binder.fetch("Page", ModelArgs::new()).unwrap();
    assert_eq!(result.tree["Footer"], json!({"links": {"variable": "x"}}));
    assert_eq!(result.tree["Page"], json!({"content": {"title": "Hello"}}));
}

#[test]
fn nested_submodel_lands_inside_parent_entry() {
    let spies = Spies::default();
    let registry = ModelRegistry::builder()
        .register(page_spec(&spies, &["bind_footer"]))
        .register(footer_spec(&["bind_social"]))
        .register(social_spec())
        .build()
        .unwrap();
    let binder = binder(registry);

    let result = binder.fetch("Page", ModelArgs::new()).unwrap();
    assert_eq!(
        result.tree["Footer"]["Social"],
        json!({"count": 3, "parents": ["Page", "Footer"]})
    );
}

#[test]
fn bind_sub_as_splits_one_type_across_identities() {
    let spies = Spies::default();
    let registry = ModelRegistry::builder()
        .register(page_spec(&spies, &["bind_regions"]))
        .register(footer_spec(&["bind_links"]))
        .build()
        .unwrap();
    let binder = binder(registry);

    let result = binder.fetch("Page", ModelArgs::new()).unwrap();
    assert_eq!(
        result.tree["FooterLeft"],
        json!({"links": {"variable": "left"}})
    );
    assert_eq!(
        result.tree["FooterRight"],
        json!({"links": {"variable": "right"}})
    );
    assert!(result.tree.get("Footer").is_none());
}

#[test]
fn termination_in_submodel_stops_parent_catalog() {
    let spies = Spies::default();
    let registry = ModelRegistry::builder()
        .register(page_spec(&spies, &["bind_content", "bind_stop", "bind_after"]))
        .register(halting_spec())
        .build()
        .unwrap();
    let binder = binder(registry);

    let result = binder.fetch("Page", ModelArgs::new()).unwrap();
    assert!(result.terminated);
    assert_eq!(spies.content.load(Ordering::SeqCst), 1);
    assert_eq!(spies.after.load(Ordering::SeqCst), 0);
    assert!(result.tree.get("Page").is_some());
}

#[test]
fn layered_catalog_runs_base_methods_first() {
    let order: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));

    struct Recorder {
        order: Arc<Mutex<Vec<&'static str>>>,
    }

    impl Model for Recorder {
        fn invoke(
            &mut self,
            method: &str,
            _scope: &mut BindScope<'_>,
        ) -> Result<Option<Value>, BindError> {
            let mut order = self.order.lock().unwrap();
            match method {
                "bind_kicker" => order.push("bind_kicker"),
                "bind_body" => order.push("bind_body"),
                other => return Err(BindError::unknown_method("Story", other)),
            }
            Ok(None)
        }
    }

    let handle = order.clone();
    let registry = ModelRegistry::builder()
        .register(
            ModelSpec::new("Story", move |_args| {
                Box::new(Recorder {
                    order: handle.clone(),
                })
            })
            .catalog(
                MethodCatalog::new()
                    .layer(MethodLayer::new("Article").public_zero("bind_kicker"))
                    .layer(MethodLayer::new("Story").public_zero("bind_body")),
            ),
        )
        .build()
        .unwrap();

    binder(registry).fetch("Story", ModelArgs::new()).unwrap();
    assert_eq!(*order.lock().unwrap(), vec!["bind_kicker", "bind_body"]);
}

#[test]
fn tidy_fetch_returns_flat_map() {
    let spies = Spies::default();
    let registry = ModelRegistry::builder()
        .register(page_spec(&spies, &["bind_content"]))
        .build()
        .unwrap();
    let binder = binder(registry);

    let values = binder.fetch_tidy("Page", ModelArgs::new(), None).unwrap();
    assert_eq!(values.get("content"), Some(&json!({"title": "Hello"})));
    assert!(!values.contains_key("Page"));
}

#[test]
fn restricted_method_denied_in_normal_context() {
    let spies = Spies::default();
    let registry = ModelRegistry::builder()
        .register(page_spec(&spies, &["bind_content", "bind_secret"]))
        .build()
        .unwrap();
    let binder = binder(registry);

    let functions = vec!["bind_content".to_string(), "bind_secret".to_string()];
    let values = binder
        .fetch_tidy("Page", ModelArgs::new(), Some(&functions))
        .unwrap();

    assert_eq!(values.get("content"), Some(&json!({"title": "Hello"})));
    assert!(values["secret"]["error"].is_string());
    assert_eq!(spies.secret.load(Ordering::SeqCst), 0);
}

#[test]
fn unknown_function_request_is_fatal() {
    let spies = Spies::default();
    let registry = ModelRegistry::builder()
        .register(page_spec(&spies, &["bind_content"]))
        .build()
        .unwrap();
    let binder = binder(registry);

    let functions = vec!["bind_missing".to_string()];
    let err = binder
        .fetch_tidy("Page", ModelArgs::new(), Some(&functions))
        .expect_err("unknown method");
    assert!(matches!(err, BindError::UnknownMethod { .. }));
    assert_eq!(spies.content.load(Ordering::SeqCst), 0);
}

#[test]
fn fetch_as_renames_the_identity() {
    let spies = Spies::default();
    let registry = ModelRegistry::builder()
        .register(page_spec(&spies, &["bind_content"]))
        .build()
        .unwrap();
    let binder = binder(registry);

    let result = binder.fetch_as("Page", "Landing", ModelArgs::new()).unwrap();
    assert!(result.tree.get("Landing").is_some());
    assert!(result.tree.get("Page").is_none());
}

#[test]
fn scope_bind_merges_mappings_and_targets_other_models() {
    let spies = Spies::default();
    let registry = ModelRegistry::builder()
        .register(page_spec(&spies, &["bind_meta"]))
        .build()
        .unwrap();
    let binder = binder(registry);

    let result = binder.fetch("Page", ModelArgs::new()).unwrap();
    assert_eq!(result.tree["Page"]["meta"], json!({"a": 1, "b": 2}));
    assert_eq!(result.tree["Sidebar"], json!({"promo": "springtime"}));
}

#[test]
fn unknown_submodel_type_is_fatal() {
    struct Lonely;

    impl Model for Lonely {
        fn invoke(
            &mut self,
            method: &str,
            scope: &mut BindScope<'_>,
        ) -> Result<Option<Value>, BindError> {
            match method {
                "bind_orphan" => {
                    scope.bind_sub("Ghost", ModelArgs::new())?;
                    Ok(None)
                }
                other => Err(BindError::unknown_method("Lonely", other)),
            }
        }
    }

    let registry = ModelRegistry::builder()
        .register(
            ModelSpec::new("Lonely", |_args| Box::new(Lonely)).catalog(
                MethodCatalog::new().layer(MethodLayer::new("Lonely").public_zero("bind_orphan")),
            ),
        )
        .build()
        .unwrap();

    let err = binder(registry)
        .fetch("Lonely", ModelArgs::new())
        .expect_err("unknown submodel");
    assert!(matches!(err, BindError::UnknownModel { .. }));
}
