use crate::registry::ComponentRegistry;

/// Whether a control-flow tag shapes content or, as an `apply-*` clone
/// inside an attribute fragment, the attribute list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Content,
    Applied,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagKind<'a> {
    Param,
    Variable,
    Attribute,
    ApplyAttribute,
    If(Flow),
    ForEach(Flow),
    Switch(Flow),
    Case(Flow),
    Default(Flow),
    Import,
    Template,
    UseState,
    Include,
    Component(&'a str),
    Literal(&'a str),
}

/// Control-flow and attribute tags, content and applied forms. Walking up
/// through these finds the tag whose attributes they modify.
const RESERVED_TAGS: [&str; 12] = [
    "apply-attribute",
    "attribute",
    "apply-if",
    "if",
    "apply-for-each",
    "for-each",
    "switch",
    "case",
    "default",
    "apply-switch",
    "apply-case",
    "apply-default",
];

/// Content-flow tags that move a fragment cursor when they finish.
const PAIRED_TAGS: [&str; 5] = ["if", "for-each", "switch", "case", "default"];

pub fn is_reserved(name: &str) -> bool {
    RESERVED_TAGS.contains(&name)
}

pub fn is_paired(name: &str) -> bool {
    PAIRED_TAGS.contains(&name)
}

pub fn is_switch(name: &str) -> bool {
    matches!(name, "switch" | "apply-switch")
}

/// `if` -> `apply-if`, etc.
pub fn applied_name(name: &str) -> String {
    format!("apply-{}", name)
}

pub fn classify<'a>(name: &'a str, registry: &ComponentRegistry) -> TagKind<'a> {
    match name {
        "param" => TagKind::Param,
        "variable" => TagKind::Variable,
        "attribute" => TagKind::Attribute,
        "apply-attribute" => TagKind::ApplyAttribute,
        "if" => TagKind::If(Flow::Content),
        "apply-if" => TagKind::If(Flow::Applied),
        "for-each" => TagKind::ForEach(Flow::Content),
        "apply-for-each" => TagKind::ForEach(Flow::Applied),
        "switch" => TagKind::Switch(Flow::Content),
        "apply-switch" => TagKind::Switch(Flow::Applied),
        "case" => TagKind::Case(Flow::Content),
        "apply-case" => TagKind::Case(Flow::Applied),
        "default" => TagKind::Default(Flow::Content),
        "apply-default" => TagKind::Default(Flow::Applied),
        "import" => TagKind::Import,
        "template" => TagKind::Template,
        "use-state" => TagKind::UseState,
        "include" => TagKind::Include,
        _ if registry.contains(name) => TagKind::Component(name),
        _ => TagKind::Literal(name),
    }
}
