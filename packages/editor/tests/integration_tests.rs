//! End-to-end editing sessions: load, edit through options, save

use std::thread;
use xsdedit_editor::{
    DocumentModel, EditorConfig, EditorError, ManipulationKind, MutationError, NotificationKind,
    RuleId, RuleSet,
};
use xsdedit_schema::{AttributeUse, ConstraintTree, MaxOccurs, Occurs, XsdSchema};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// session(stimulus{1,3}(@id ID), (rest | break), note?)
fn session_tree() -> ConstraintTree {
    let mut builder = ConstraintTree::builder("session");
    let root = builder.root();
    let seq = builder.sequence(root);
    let stimulus = builder.element(seq, "stimulus", Occurs::new(1, MaxOccurs::Bounded(3)));
    let id = builder.attribute(stimulus, "id", AttributeUse::Required);
    builder.set_type(id, "ID");
    let choice = builder.choice(seq);
    builder.text_element(choice, "rest", Occurs::once(), "nonNegativeInteger");
    builder.element(choice, "break", Occurs::once());
    builder.text_element(seq, "note", Occurs::optional(), "string");
    builder.finish()
}

fn fresh() -> DocumentModel {
    DocumentModel::new_document(session_tree(), RuleSet::new(), EditorConfig::default())
        .expect("minimal document")
}

fn children(model: &DocumentModel, name: &str) -> Vec<xsdedit_editor::NodeId> {
    let root = model.root().expect("root");
    model
        .document()
        .element_children(root)
        .filter(|c| model.document().name(*c) == name)
        .collect()
}

#[test]
fn test_siblings_stop_at_max_occurs() -> anyhow::Result<()> {
    init_tracing();
    let mut model = fresh();

    for expected in 1..3 {
        let last = *children(&model, "stimulus").last().expect("stimulus");
        let add = model
            .manipulation_options(last)
            .into_iter()
            .find(|o| o.kind() == ManipulationKind::AddSibling)
            .expect("room for another stimulus");
        add.execute(&mut model)?;
        assert_eq!(children(&model, "stimulus").len(), expected + 1);
    }

    let last = *children(&model, "stimulus").last().expect("stimulus");
    let kinds: Vec<_> = model.manipulation_options(last).iter().map(|o| o.kind()).collect();
    assert!(!kinds.contains(&ManipulationKind::AddSibling));
    assert!(kinds.contains(&ManipulationKind::Remove));
    Ok(())
}

#[test]
fn test_last_required_occurrence_cannot_be_removed() {
    let mut model = fresh();
    let only = children(&model, "stimulus")[0];
    let kinds: Vec<_> = model.manipulation_options(only).iter().map(|o| o.kind()).collect();
    assert!(!kinds.contains(&ManipulationKind::Remove));
}

#[test]
fn test_saved_document_loads_again() -> anyhow::Result<()> {
    init_tracing();
    let model = fresh();
    let xml = model.to_xml_string()?;
    assert!(xml.contains("<stimulus"));

    let reloaded = DocumentModel::load(&xml, session_tree(), RuleSet::new(), EditorConfig::default())?;
    assert_eq!(children(&reloaded, "stimulus").len(), 1);
    assert_eq!(children(&reloaded, "rest").len(), 1);
    Ok(())
}

#[test]
fn test_non_conforming_document_is_rejected() {
    let xml = "<session><rest>1</rest></session>";
    let result = DocumentModel::load(xml, session_tree(), RuleSet::new(), EditorConfig::default());
    assert!(matches!(result, Err(EditorError::NotCompliant { root }) if root == "session"));
}

#[test]
fn test_duplicate_id_is_promoted_when_owner_goes() -> anyhow::Result<()> {
    init_tracing();
    let xml = r#"<session><stimulus id="s1"/><stimulus id="s2"/><break/></session>"#;
    let mut model = DocumentModel::load(xml, session_tree(), RuleSet::new(), EditorConfig::default())?;
    let stimuli = children(&model, "stimulus");
    let first = model.document().attribute(stimuli[0], "id").expect("first id");
    let second = model.document().attribute(stimuli[1], "id").expect("second id");

    model.set_node_value(second, "s1")?;
    assert!(model.validation_result(first, false).value_has_correct_type);
    assert!(!model.validation_result(second, false).value_has_correct_type);
    assert_eq!(model.ids().candidates("s1"), &[first, second]);

    model.remove_node(stimuli[0])?;
    assert_eq!(model.ids().owner_of("s1"), Some(second));
    assert!(model.validation_result(second, false).value_has_correct_type);
    Ok(())
}

#[test]
fn test_rewriting_same_id_keeps_owner() -> anyhow::Result<()> {
    let xml = r#"<session><stimulus id="s1"/><stimulus id="s1"/><break/></session>"#;
    let mut model = DocumentModel::load(xml, session_tree(), RuleSet::new(), EditorConfig::default())?;
    let stimuli = children(&model, "stimulus");
    let first = model.document().attribute(stimuli[0], "id").expect("first id");
    let second = model.document().attribute(stimuli[1], "id").expect("second id");
    assert_eq!(model.ids().owner_of("s1"), Some(first));

    model.set_node_value(first, "s1")?;
    assert_eq!(model.ids().owner_of("s1"), Some(first));
    assert_eq!(model.ids().candidates("s1"), &[first, second]);
    assert!(model.validation_result(first, false).value_has_correct_type);
    assert!(!model.validation_result(second, false).value_has_correct_type);
    Ok(())
}

#[test]
fn test_options_go_stale_after_an_edit() -> anyhow::Result<()> {
    let mut model = fresh();
    let root = model.root().expect("root");
    let before = model.manipulation_options(root);
    let add_note = before
        .iter()
        .find(|o| o.objective() == "note")
        .expect("note can be added")
        .clone();

    add_note.execute(&mut model)?;
    assert!(matches!(
        add_note.execute(&mut model),
        Err(MutationError::StaleOption(_))
    ));

    let after = model.manipulation_options(root);
    assert!(after.iter().all(|o| o.objective() != "note"));
    assert_eq!(children(&model, "note").len(), 1);
    Ok(())
}

#[test]
fn test_choose_other_alternative() -> anyhow::Result<()> {
    let mut model = fresh();
    let rest = children(&model, "rest")[0];
    let swap = model
        .manipulation_options(rest)
        .into_iter()
        .find(|o| o.kind() == ManipulationKind::ChooseAlternative)
        .expect("break is an alternative");
    assert_eq!(swap.description(), "Choose alternative \"break\"");

    swap.execute(&mut model)?;
    assert!(children(&model, "rest").is_empty());
    assert_eq!(children(&model, "break").len(), 1);

    let root = model.root().expect("root");
    let names: Vec<_> = model
        .document()
        .element_children(root)
        .map(|c| model.document().name(c).to_string())
        .collect();
    assert_eq!(names, vec!["stimulus", "break"]);
    Ok(())
}

#[test]
fn test_replace_keeps_document_on_mismatch() -> anyhow::Result<()> {
    init_tracing();
    let mut model = fresh();
    let rest = children(&model, "rest")[0];
    let before = model.to_xml_string()?;

    let wrong = xsdedit_dom::parse("<rest><extra/></rest>")?;
    let wrong_root = wrong.root_element().expect("root");
    assert_eq!(
        model.replace(rest, &wrong, wrong_root),
        Err(MutationError::NotCompliant(rest))
    );
    assert_eq!(model.to_xml_string()?, before);

    let right = xsdedit_dom::parse("<rest>30</rest>")?;
    let right_root = right.root_element().expect("root");
    let replaced = model.replace(rest, &right, right_root)?;
    assert_eq!(model.document().node_value(replaced), "30");
    assert!(!model.document().contains(rest));
    assert!(model.validation_result(replaced, false).value_has_correct_type);
    Ok(())
}

const SCHEMA: &str = r#"
<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
  <xs:element name="scan">
    <xs:complexType>
      <xs:sequence>
        <xs:element name="tr" type="xs:integer"/>
      </xs:sequence>
      <xs:attribute name="label" type="xs:string"/>
    </xs:complexType>
  </xs:element>
</xs:schema>
"#;

const RULES: &str = r#"
<edlRules>
  <rule ruleID="tr-minimum">
    <param pID="TR" pName="Repetition time"><paramRef>scan.tr.CONTENT</paramRef></param>
    <premise><literal>edlValidation_exists(TR)</literal></premise>
    <conclusion><literal>edlValidation_biggerThan(TR, 500)</literal></conclusion>
    <message>Repetition time must exceed 500 ms.</message>
  </rule>
</edlRules>
"#;

#[test]
fn test_load_with_schema_file() -> anyhow::Result<()> {
    let schema = XsdSchema::parse(SCHEMA)?;
    let mut model = DocumentModel::load_with(
        r#"<scan label="pilot"><tr>2000</tr></scan>"#,
        &schema,
        RuleSet::new(),
        EditorConfig::default(),
    )?;
    let root = model.root().expect("root");
    assert!(model.validation_result(root, true).value_has_correct_type);

    let label = model.document().attribute(root, "label").expect("label");
    let kinds: Vec<_> = model.manipulation_options(label).iter().map(|o| o.kind()).collect();
    assert_eq!(kinds, vec![ManipulationKind::RemoveAttribute]);
    Ok(())
}

#[test]
fn test_violated_rule_is_reported_and_resolved() -> anyhow::Result<()> {
    init_tracing();
    let schema = XsdSchema::parse(SCHEMA)?;
    let rules = RuleSet::from_xml_str(RULES)?;
    let mut model = DocumentModel::load_with("<scan><tr>300</tr></scan>", &schema, rules, EditorConfig::default())?;
    let rule = RuleId::new("tr-minimum");
    let root = model.root().expect("root");
    let tr = model.document().element_children(root).next().expect("tr");

    assert_eq!(model.relevant_rules(tr), &[rule.clone()]);
    let result = model.validation_result(tr, false);
    assert!(result.value_has_correct_type);
    assert!(!result.is_valid(model.rules()));

    let notifications = model.take_notifications();
    assert_eq!(notifications.len(), 1);
    let violation = &notifications[0];
    assert_eq!(violation.kind(), NotificationKind::Warn);
    assert_eq!(violation.brief(), "Repetition time must exceed 500 ms.");
    assert_eq!(violation.violation().map(|v| v.rule()), Some(&rule));
    assert!(!violation.is_resolved());

    model.set_node_value(tr, "1000")?;
    assert!(violation.is_resolved());
    assert!(model.validation_result(tr, false).is_valid(model.rules()));
    assert!(model.take_notifications().is_empty());

    model.set_node_value(tr, "100")?;
    assert_eq!(model.take_notifications().len(), 1);
    Ok(())
}

const OPTIONAL_TR_SCHEMA: &str = r#"
<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
  <xs:element name="scan">
    <xs:complexType>
      <xs:sequence>
        <xs:element name="tr" type="xs:integer" minOccurs="0"/>
      </xs:sequence>
    </xs:complexType>
  </xs:element>
</xs:schema>
"#;

#[test]
fn test_added_node_feeds_waiting_rule() -> anyhow::Result<()> {
    init_tracing();
    let schema = XsdSchema::parse(OPTIONAL_TR_SCHEMA)?;
    let rules = RuleSet::from_xml_str(RULES)?;
    let mut model = DocumentModel::load_with("<scan/>", &schema, rules, EditorConfig::default())?;
    let rule = RuleId::new("tr-minimum");
    assert!(model.rules().is_satisfied(&rule));
    assert!(model.take_notifications().is_empty());

    let root = model.root().expect("root");
    let add_tr = model
        .manipulation_options(root)
        .into_iter()
        .find(|o| o.kind() == ManipulationKind::AddChild)
        .expect("tr can be added");
    let tr = add_tr.execute(&mut model)?.expect("tr was added");

    assert_eq!(model.relevant_rules(tr), &[rule.clone()]);
    assert!(!model.rules().is_satisfied(&rule));
    let notifications = model.take_notifications();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].violation().map(|v| v.rule()), Some(&rule));
    Ok(())
}

#[test]
fn test_config_from_json() -> anyhow::Result<()> {
    let config = EditorConfig::from_json_str(r#"{ "attributeWhitelist": ["xmlns"], "saveIndent": 2 }"#)?;
    assert!(config.is_whitelisted("xmlns"));
    assert!(!config.is_whitelisted("xmlns:xsi"));

    let model = DocumentModel::new_document(session_tree(), RuleSet::new(), config)?;
    assert!(model.to_xml_string()?.contains("\n  <stimulus"));
    Ok(())
}

#[test]
fn test_background_notifications() {
    let mut model = fresh();
    let notifier = model.notifier();
    let worker = thread::spawn(move || notifier.error("Autosave failed\ndisk is full"));
    assert!(worker.join().expect("worker finished"));

    let notifications = model.take_notifications();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].kind(), NotificationKind::Error);
    assert_eq!(notifications[0].brief(), "Autosave failed");
    assert_eq!(notifications[0].verbose(), "Autosave failed\ndisk is full");
}

#[test]
fn test_save_to_writer() -> anyhow::Result<()> {
    let model = fresh();
    let mut buffer = Vec::new();
    model.save_to(&mut buffer)?;
    assert_eq!(String::from_utf8(buffer)?, model.to_xml_string()?);
    Ok(())
}
