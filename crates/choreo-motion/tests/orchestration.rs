use anyhow::Result;
use choreo_motion::{ElementRef, HeadlessBackend, MotionEngine, NodeConfig, PropertyValue};
use serde_json::{Value, json};

fn config(value: Value) -> Result<NodeConfig> {
    Ok(serde_json::from_value(value)?)
}

fn child_config() -> Result<NodeConfig> {
    config(json!({
        "initial": "hidden",
        "variants": {
            "hidden": { "opacity": 0 },
            "visible": { "opacity": 1 }
        }
    }))
}

fn staggered_parent(transition: Value) -> Result<NodeConfig> {
    config(json!({
        "initial": "hidden",
        "animate": "visible",
        "variants": {
            "hidden": { "opacity": 0 },
            "visible": { "opacity": 1 }
        },
        "transition": transition
    }))
}

fn delays(backend: &HeadlessBackend, elements: &[u64]) -> Vec<f64> {
    elements
        .iter()
        .map(|element| {
            let starts = backend.starts_for(ElementRef(*element));
            assert_eq!(starts.len(), 1, "element {element} should start once");
            starts[0].options.delay
        })
        .collect()
}

fn assert_close(actual: &[f64], expected: &[f64]) {
    assert_eq!(actual.len(), expected.len());
    for (a, e) in actual.iter().zip(expected) {
        assert!((a - e).abs() < 1e-9, "expected {expected:?}, got {actual:?}");
    }
}

fn mount_family(
    engine: &mut MotionEngine<HeadlessBackend>,
    parent: NodeConfig,
) -> Result<choreo_motion::NodeId> {
    let id = engine.mount(ElementRef(1), parent, &[]);
    for element in 2..=4 {
        engine.mount(ElementRef(element), child_config()?, &[ElementRef(1)]);
    }
    Ok(id)
}

#[test]
fn children_start_in_stagger_order() -> Result<()> {
    let backend = HeadlessBackend::new();
    let mut engine = MotionEngine::with_defaults(backend.clone());
    let parent = mount_family(&mut engine, staggered_parent(json!({ "staggerChildren": 0.1 }))?)?;

    // Nothing animates until the parent's content is ready.
    assert!(backend.starts().is_empty());
    engine.content_children_ready(parent, &[])?;

    assert_close(&delays(&backend, &[1]), &[0.0]);
    assert_close(&delays(&backend, &[2, 3, 4]), &[0.0, 0.1, 0.2]);
    assert_eq!(
        backend.starts_for(ElementRef(3))[0].keyframes["opacity"],
        PropertyValue::Number(1.0)
    );
    Ok(())
}

#[test]
fn after_children_delays_parent() -> Result<()> {
    let backend = HeadlessBackend::new();
    let mut engine = MotionEngine::with_defaults(backend.clone());
    let parent = mount_family(
        &mut engine,
        staggered_parent(json!({ "staggerChildren": 0.1, "when": "afterChildren" }))?,
    )?;
    engine.content_children_ready(parent, &[])?;

    assert_close(&delays(&backend, &[2, 3, 4]), &[0.0, 0.1, 0.2]);
    assert_close(&delays(&backend, &[1]), &[0.3]);
    Ok(())
}

#[test]
fn negative_direction_reverses_order() -> Result<()> {
    let backend = HeadlessBackend::new();
    let mut engine = MotionEngine::with_defaults(backend.clone());
    let parent = mount_family(
        &mut engine,
        staggered_parent(json!({
            "staggerChildren": 0.1,
            "staggerDirection": -1,
            "delayChildren": 0.5
        }))?,
    )?;
    engine.content_children_ready(parent, &[])?;

    assert_close(&delays(&backend, &[2, 3, 4]), &[0.7, 0.6, 0.5]);
    Ok(())
}

#[test]
fn plain_children_follow_parent_variants() -> Result<()> {
    let backend = HeadlessBackend::new();
    let mut engine = MotionEngine::with_defaults(backend.clone());
    let parent = engine.mount(
        ElementRef(1),
        staggered_parent(json!({ "staggerChildren": 0.05, "duration": 0.4 }))?,
        &[],
    );
    engine.content_children_ready(parent, &[ElementRef(10), ElementRef(11)])?;

    let writes = backend.style_writes_for(ElementRef(11));
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0].styles["opacity"], PropertyValue::Number(0.0));

    assert_close(&delays(&backend, &[10, 11]), &[0.0, 0.05]);
    assert_eq!(backend.starts_for(ElementRef(11))[0].options.duration, 0.4);
    Ok(())
}

#[test]
fn child_without_parent_variant_uses_own_target() -> Result<()> {
    let backend = HeadlessBackend::new();
    let mut engine = MotionEngine::with_defaults(backend.clone());
    let parent = engine.mount(
        ElementRef(1),
        staggered_parent(json!({ "staggerChildren": 0.2 }))?,
        &[],
    );
    engine.mount(
        ElementRef(2),
        config(json!({ "animate": { "x": 40 } }))?,
        &[ElementRef(1)],
    );
    engine.mount(ElementRef(3), NodeConfig::default(), &[ElementRef(1)]);
    engine.content_children_ready(parent, &[])?;

    let starts = backend.starts_for(ElementRef(2));
    assert_eq!(starts.len(), 1);
    assert_eq!(
        starts[0].keyframes["transform"].as_str(),
        Some("matrix(1, 0, 0, 1, 40, 0)")
    );
    // A child with no target at all is skipped.
    assert!(backend.starts_for(ElementRef(3)).is_empty());
    Ok(())
}

#[test]
fn late_child_starts_itself() -> Result<()> {
    let backend = HeadlessBackend::new();
    let mut engine = MotionEngine::with_defaults(backend.clone());
    let parent = engine.mount(
        ElementRef(1),
        staggered_parent(json!({ "staggerChildren": 0.1 }))?,
        &[],
    );
    engine.content_children_ready(parent, &[])?;
    engine.advance(1000.0);

    engine.mount(
        ElementRef(2),
        config(json!({ "initial": { "opacity": 0 }, "animate": { "opacity": 1 } }))?,
        &[ElementRef(1)],
    );
    assert_eq!(backend.starts_for(ElementRef(2)).len(), 1);
    Ok(())
}
