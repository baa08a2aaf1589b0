//! # Template Compiler
//!
//! One recursive walk over the document arena turns a template into a PHP
//! closure that builds node records:
//!
//! ```php
//! return function ($__data = [], $__children = [], $__isComponent = false, $__state = []) {
//!     ...
//!     return $children0;
//! };
//! ```
//!
//! ## Invariants
//!
//! 1. **Accumulators**: `$childrenN` collects the records of the node with
//!    identity `N`; `$children0` is the root and is what the closure returns.
//! 2. **Attribute blocks**: `$attrsF` is built from the tag's fragment first
//!    and its literal attributes second, so literals win.
//! 3. **Scope**: a variable reads from `$__scope` iff its bare name is
//!    assigned anywhere in the invocation, otherwise from `$__data`.
//! 4. **Failure**: the first error aborts the invocation; no partial output.

use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};
use tracing::{debug, instrument, trace};

use crate::ast::{AttrNode, AttrPart, Expr, SourceLocation, Template};
use crate::code::{php_string, statement, Code, COMPONENTS, STATE};
use crate::document::{Document, NodeData, NodeId};
use crate::expression::{ExprCompiler, ExprContext, UnsupportedExpression};
use crate::fragment::AttributeFragments;
use crate::loader::{JsonFileLoader, TemplateLoader};
use crate::registry::{ComponentRegistry, RegistryScope};
use crate::scope::ScopeSet;
use crate::switch::{CaseBranch, DefaultBranch, SwitchMarkers};
use crate::tags::{self, Flow, TagKind};
use crate::validate::{CompilerError, ErrorKind, TagParams};

const ROOT_SINK: u32 = 0;

const PROLOGUE: &str = "<?php

return function ($__data = [], $__children = [], $__isComponent = false, $__state = []) {
$__scope = [];
$__components = [];
$children0 = [];
?>
";

const EPILOGUE: &str = "<?php
return $children0;
};
";

// ═══════════════════════════════════════════════════════════════════════════════
// OPTIONS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompileOptions {
    /// Path of the template being compiled; used in errors and as the base
    /// for `include`.
    pub file_path: String,
    /// Tags compiled without a `children` key even when not self-closing.
    pub single_tags: Vec<String>,
    pub registry_scope: RegistryScope,
    /// Appended to `from` in `import`.
    pub component_extension: String,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            file_path: String::new(),
            single_tags: vec!["input".to_string()],
            registry_scope: RegistryScope::Process,
            component_extension: ".php".to_string(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ENTRY POINTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Compile with includes resolved from AST JSON files on disk.
pub fn compile(template: &Template, options: &CompileOptions) -> Result<String, CompilerError> {
    compile_with_loader(template, options, &JsonFileLoader)
}

#[instrument(skip_all, fields(file = %options.file_path))]
pub fn compile_with_loader(
    template: &Template,
    options: &CompileOptions,
    loader: &dyn TemplateLoader,
) -> Result<String, CompilerError> {
    let mut session = CompileSession::new(options, loader);
    let roots = session.document.import(&template.nodes, None);
    let body = session.compile_nodes(&roots, ROOT_SINK)?;
    debug!(locals = session.scope.len(), "compiled template");
    Ok(format!(
        "{}{}{}",
        PROLOGUE,
        body.render(&session.scope),
        EPILOGUE
    ))
}

/// Parse AST JSON and compile it.
pub fn compile_json(source: &str, options: &CompileOptions) -> Result<String, CompilerError> {
    let template: Template = serde_json::from_str(source).map_err(|e| {
        CompilerError::new(
            ErrorKind::InvalidAst,
            format!("invalid template AST: {}", e),
            &options.file_path,
            &SourceLocation {
                line: e.line() as u32,
                column: e.column() as u32,
            },
        )
    })?;
    compile(&template, options)
}

// ═══════════════════════════════════════════════════════════════════════════════
// SESSION
// ═══════════════════════════════════════════════════════════════════════════════

/// Owned copy of a tag's header, so handlers can mutate the arena freely.
struct TagInfo {
    identity: u32,
    name: String,
    attrs: Vec<AttrNode>,
    is_single: bool,
    location: SourceLocation,
}

struct CompileSession<'a> {
    document: Document,
    options: &'a CompileOptions,
    loader: &'a dyn TemplateLoader,
    registry: ComponentRegistry,
    scope: ScopeSet,
    fragments: AttributeFragments,
    switches: SwitchMarkers,
    /// Include stack; the last entry is the file being compiled.
    files: Vec<PathBuf>,
}

impl<'a> CompileSession<'a> {
    fn new(options: &'a CompileOptions, loader: &'a dyn TemplateLoader) -> Self {
        Self {
            document: Document::new(),
            options,
            loader,
            registry: ComponentRegistry::new(options.registry_scope),
            scope: ScopeSet::new(),
            fragments: AttributeFragments::new(),
            switches: SwitchMarkers::new(),
            files: vec![normalize(Path::new(&options.file_path))],
        }
    }

    // ───────────────────────────────────────────────────────────────────────────
    // Helpers
    // ───────────────────────────────────────────────────────────────────────────

    fn current_file(&self) -> String {
        self.files
            .last()
            .map(|p| p.display().to_string())
            .unwrap_or_default()
    }

    fn error(&self, kind: ErrorKind, message: impl Into<String>, location: &SourceLocation) -> CompilerError {
        CompilerError::new(kind, message, &self.current_file(), location)
    }

    fn tag_info(&self, id: NodeId) -> Option<TagInfo> {
        let node = self.document.node(id);
        self.document.tag(id).map(|tag| TagInfo {
            identity: node.identity,
            name: tag.name.clone(),
            attrs: tag.attrs.clone(),
            is_single: tag.is_single,
            location: node.location.clone(),
        })
    }

    fn is_single_tag(&self, info: &TagInfo) -> bool {
        info.is_single
            || info.name.eq_ignore_ascii_case("!doctype")
            || self.options.single_tags.iter().any(|t| *t == info.name)
    }

    fn require<'p>(
        &self,
        params: &TagParams<'p>,
        attr: &str,
        info: &TagInfo,
    ) -> Result<&'p AttrPart, CompilerError> {
        params.get(attr).ok_or_else(|| {
            self.error(
                ErrorKind::MissingAttribute,
                format!("<{}> must contain `{}` attribute", info.name, attr),
                &info.location,
            )
        })
    }

    fn expr(&mut self, expr: &Expr, ctx: ExprContext, location: &SourceLocation) -> Result<Code, CompilerError> {
        let result = ExprCompiler::new(&mut self.scope).compile(expr, ctx);
        result.map_err(|UnsupportedExpression| {
            self.error(
                ErrorKind::UnsupportedExpression,
                "unsupported expression",
                location,
            )
        })
    }

    fn attr_part(&mut self, part: &AttrPart, ctx: ExprContext, location: &SourceLocation) -> Result<Code, CompilerError> {
        match part {
            AttrPart::Literal { value } => Ok(code![php_string(value)]),
            AttrPart::Expression { expr } => self.expr(expr, ctx, location),
        }
    }

    /// Assignment target. A literal `name="x"` is read as the variable `x`.
    fn target(&mut self, part: &AttrPart, ctx: ExprContext, location: &SourceLocation) -> Result<Code, CompilerError> {
        match part {
            AttrPart::Literal { value } => {
                let var = Expr::Var {
                    name: value.clone(),
                    keys: Vec::new(),
                };
                self.expr(&var, ctx, location)
            }
            AttrPart::Expression { expr } => self.expr(expr, ctx, location),
        }
    }

    /// Nearest ancestor that is not a control-flow or attribute tag.
    fn parent_tag(&self, id: NodeId) -> Option<NodeId> {
        let mut current = id;
        loop {
            let parent = self.document.parent(current)?;
            match self.document.tag_name(parent) {
                Some(name) if tags::is_reserved(name) => current = parent,
                _ => return Some(parent),
            }
        }
    }

    fn enclosing_fragment(&self, id: NodeId) -> Option<NodeId> {
        self.parent_tag(id).and_then(|tag| self.fragments.get(tag))
    }

    /// Mirror a content control-flow node into the enclosing tag's fragment.
    fn clone_into_fragment(&mut self, id: NodeId, name: &str) {
        if let Some(fragment) = self.enclosing_fragment(id) {
            self.fragments
                .append(&mut self.document, fragment, id, &tags::applied_name(name), true);
        }
    }

    /// A finished applied node hands the cursor back to its parent.
    fn restore_applied_cursor(&mut self, id: NodeId) {
        let root = self.document.root_of(id);
        if self.fragments.is_fragment(root) {
            if let Some(parent) = self.document.parent(id) {
                self.fragments.set_cursor(root, parent);
            }
        }
    }

    /// A finished content paired node closes its level in the fragment.
    fn finish_node(&mut self, id: NodeId) {
        let paired = self.document.tag_name(id).is_some_and(tags::is_paired);
        if !paired {
            return;
        }
        if let Some(fragment) = self.enclosing_fragment(id) {
            self.fragments.pop(&self.document, fragment);
        }
    }

    fn parent_is_switch(&self, id: NodeId) -> bool {
        self.document
            .parent(id)
            .and_then(|p| self.document.tag_name(p))
            .is_some_and(tags::is_switch)
    }

    // ───────────────────────────────────────────────────────────────────────────
    // Walk
    // ───────────────────────────────────────────────────────────────────────────

    fn compile_nodes(&mut self, nodes: &[NodeId], sink: u32) -> Result<Code, CompilerError> {
        let mut out = Code::new();
        for node in nodes {
            out.append(self.compile_node(*node, sink)?);
        }
        Ok(out)
    }

    fn compile_children(&mut self, id: NodeId, sink: u32) -> Result<Code, CompilerError> {
        let children = self.document.children(id).to_vec();
        let out = self.compile_nodes(&children, sink)?;
        self.finish_node(id);
        Ok(out)
    }

    fn compile_node(&mut self, id: NodeId, sink: u32) -> Result<Code, CompilerError> {
        let node = self.document.node(id);
        let identity = node.identity;
        let location = node.location.clone();
        match node.data.clone() {
            NodeData::Tag(_) => self.compile_tag(id, sink),
            NodeData::Text(text) => {
                if self.parent_is_switch(id) {
                    if text.trim().is_empty() {
                        return Ok(Code::new());
                    }
                    return Err(self.error(
                        ErrorKind::TextInsideSwitch,
                        "text must not be placed inside <switch>",
                        &location,
                    ));
                }
                Ok(record(sink, "text", &text))
            }
            NodeData::Comment(value) => Ok(record(sink, "comment", &value)),
            NodeData::StringLiteral(value) => Ok(record(sink, "text", &value)),
            NodeData::ExpressionSlot(expr) | NodeData::ExpressionBlock(expr) => {
                let value = self.expr(&expr, ExprContext::Value, &location)?;
                Ok(expression_block(identity, sink, value))
            }
            NodeData::Script { attrs, body } => {
                let fragment = self.fragments.link(&mut self.document, id);
                let attrs = self.attrs_block(fragment, &attrs, sink, &location);
                self.fragments.unlink(id);
                let mut out = attrs?;
                let f = self.document.node(fragment).identity;
                out.append(statement(code![
                    "$children",
                    sink,
                    "[] = [\"script\" => [\"attrs\" => $attrs",
                    f,
                    ", \"body\" => ",
                    php_string(&body),
                    "]];"
                ]));
                Ok(out)
            }
        }
    }

    /// `$attrsF = [];`, the fragment's statements, then literal attributes.
    fn attrs_block(
        &mut self,
        fragment: NodeId,
        attrs: &[AttrNode],
        sink: u32,
        location: &SourceLocation,
    ) -> Result<Code, CompilerError> {
        let f = self.document.node(fragment).identity;
        let mut out = statement(code!["$attrs", f, " = [];"]);
        out.append(self.compile_children(fragment, sink)?);
        for attr in attrs {
            let name = self.attr_part(&attr.name, ExprContext::Value, location)?;
            let value = match &attr.value {
                Some(value) => self.attr_part(value, ExprContext::Value, location)?,
                None => code!["false"],
            };
            out.append(statement(code!["$attrs", f, "[", name, "] = ", value, ";"]));
        }
        Ok(out)
    }

    // ───────────────────────────────────────────────────────────────────────────
    // Tags
    // ───────────────────────────────────────────────────────────────────────────

    fn compile_tag(&mut self, id: NodeId, sink: u32) -> Result<Code, CompilerError> {
        let Some(info) = self.tag_info(id) else {
            return Ok(Code::new());
        };
        let name = info.name.clone();
        let kind = tags::classify(&name, &self.registry);
        trace!(tag = %name, identity = info.identity, "compiling tag");

        match kind {
            TagKind::Param => self.param(&info),
            TagKind::Variable => self.variable(&info),
            TagKind::Attribute => self.attribute(id, &info),
            TagKind::ApplyAttribute => self.apply_attribute(id, &info),
            TagKind::If(flow) => self.if_tag(id, &info, flow, sink),
            TagKind::ForEach(flow) => self.for_each(id, &info, flow, sink),
            TagKind::Switch(flow) => self.switch(id, &info, flow, sink),
            TagKind::Case(flow) => self.case(id, &info, flow, sink),
            TagKind::Default(flow) => self.default(id, &info, flow, sink),
            TagKind::Import => self.import(&info),
            TagKind::Template => self.template(id, &info),
            TagKind::UseState => self.use_state(&info),
            TagKind::Include => self.include(id, &info, sink),
            TagKind::Component(component) => self.component(id, &info, component, sink),
            TagKind::Literal(_) => self.literal_tag(id, &info, sink),
        }
    }

    fn literal_tag(&mut self, id: NodeId, info: &TagInfo, sink: u32) -> Result<Code, CompilerError> {
        let fragment = self.fragments.link(&mut self.document, id);
        let result = self.literal_tag_parts(id, info, fragment, sink);
        self.fragments.unlink(id);
        let (attrs, children) = result?;

        let f = self.document.node(fragment).identity;
        let mut out = attrs;
        if self.is_single_tag(info) {
            out.append(statement(code![
                "$children",
                sink,
                "[] = [\"tag\" => ",
                php_string(&info.name),
                ", \"attrs\" => $attrs",
                f,
                "];"
            ]));
            return Ok(out);
        }

        out.append(statement(code!["$children", info.identity, " = [];"]));
        out.append(children);
        out.append(statement(code![
            "$children",
            sink,
            "[] = [\"tag\" => ",
            php_string(&info.name),
            ", \"attrs\" => $attrs",
            f,
            ", \"children\" => $children",
            info.identity,
            "];"
        ]));
        Ok(out)
    }

    /// Children first (they feed the fragment), then the attribute block.
    fn literal_tag_parts(
        &mut self,
        id: NodeId,
        info: &TagInfo,
        fragment: NodeId,
        sink: u32,
    ) -> Result<(Code, Code), CompilerError> {
        let children = if info.is_single {
            Code::new()
        } else {
            self.compile_children(id, info.identity)?
        };
        let attrs = self.attrs_block(fragment, &info.attrs, sink, &info.location)?;
        Ok((attrs, children))
    }

    fn param(&mut self, info: &TagInfo) -> Result<Code, CompilerError> {
        let params = TagParams::new(&info.attrs);
        let name = self.require(&params, "name", info)?;
        let value = self.require(&params, "value", info)?;
        let target = self.target(name, ExprContext::DataTarget, &info.location)?;
        let value = self.attr_part(value, ExprContext::Value, &info.location)?;
        Ok(statement(code![
            "if (!isset(",
            &target,
            ")) ",
            target,
            " = ",
            value,
            ";"
        ]))
    }

    fn variable(&mut self, info: &TagInfo) -> Result<Code, CompilerError> {
        let params = TagParams::new(&info.attrs);
        let name = self.require(&params, "name", info)?;
        let value = self.require(&params, "value", info)?;
        let target = self.target(name, ExprContext::Target { promote: true }, &info.location)?;
        let value = self.attr_part(value, ExprContext::Value, &info.location)?;
        Ok(statement(code![target, " = ", value, ";"]))
    }

    fn attribute(&mut self, id: NodeId, info: &TagInfo) -> Result<Code, CompilerError> {
        let params = TagParams::new(&info.attrs);
        self.require(&params, "name", info)?;
        self.require(&params, "value", info)?;
        let fragment = self.enclosing_fragment(id).ok_or_else(|| {
            self.error(
                ErrorKind::AttributeWithoutTag,
                "there is no tag which <attribute> can be applied to",
                &info.location,
            )
        })?;
        self.fragments
            .append(&mut self.document, fragment, id, &tags::applied_name("attribute"), false);
        Ok(Code::new())
    }

    fn apply_attribute(&mut self, id: NodeId, info: &TagInfo) -> Result<Code, CompilerError> {
        let params = TagParams::new(&info.attrs);
        let name = self.require(&params, "name", info)?;
        let value = self.require(&params, "value", info)?;
        let root = self.document.root_of(id);
        if !self.fragments.is_fragment(root) {
            return Err(self.error(
                ErrorKind::AttributeWithoutTag,
                "<apply-attribute> is only valid inside an attribute fragment",
                &info.location,
            ));
        }
        let f = self.document.node(root).identity;
        let name = self.attr_part(name, ExprContext::Value, &info.location)?;
        let value = self.attr_part(value, ExprContext::Value, &info.location)?;
        Ok(statement(code!["$attrs", f, "[", name, "] = ", value, ";"]))
    }

    fn if_tag(&mut self, id: NodeId, info: &TagInfo, flow: Flow, sink: u32) -> Result<Code, CompilerError> {
        if flow == Flow::Content {
            self.clone_into_fragment(id, &info.name);
        }
        let params = TagParams::new(&info.attrs);
        let test = self.require(&params, "test", info)?;

        let body = self.compile_children(id, sink)?;
        if self.document.children(id).is_empty() {
            return Ok(Code::new());
        }
        if flow == Flow::Applied {
            self.restore_applied_cursor(id);
        }

        let test = self.attr_part(test, ExprContext::Condition, &info.location)?;
        Ok(code![
            statement(code!["if (", test, ") {"]),
            body,
            statement(code!["}"])
        ])
    }

    fn for_each(&mut self, id: NodeId, info: &TagInfo, flow: Flow, sink: u32) -> Result<Code, CompilerError> {
        if flow == Flow::Content {
            self.clone_into_fragment(id, &info.name);
        }
        let params = TagParams::new(&info.attrs);
        let from = self.require(&params, "from", info)?;
        let item = self.require(&params, "item", info)?;

        let body = self.compile_children(id, sink)?;
        if self.document.children(id).is_empty() {
            return Ok(Code::new());
        }
        if flow == Flow::Applied {
            self.restore_applied_cursor(id);
        }

        let from = self.attr_part(from, ExprContext::Value, &info.location)?;
        let target = ExprContext::Target { promote: true };
        let mut binding = Code::new();
        if let Some(key) = params.get("key") {
            binding.append(self.target(key, target, &info.location)?);
            binding.push_str(" => ");
        }
        binding.append(self.target(item, target, &info.location)?);

        Ok(code![
            statement(code!["foreach (", from, " as ", binding, ") {"]),
            body,
            statement(code!["}"])
        ])
    }

    fn switch(&mut self, id: NodeId, info: &TagInfo, flow: Flow, sink: u32) -> Result<Code, CompilerError> {
        if flow == Flow::Content {
            self.clone_into_fragment(id, &info.name);
        }
        self.switches.open(id);
        let body = self.compile_children(id, sink);
        let opened = self.switches.close(id);
        let mut out = body?;
        if flow == Flow::Applied {
            self.restore_applied_cursor(id);
        }
        if opened {
            out.append(statement(code!["}"]));
        }
        Ok(out)
    }

    fn case(&mut self, id: NodeId, info: &TagInfo, flow: Flow, sink: u32) -> Result<Code, CompilerError> {
        if flow == Flow::Content {
            self.clone_into_fragment(id, &info.name);
        }
        let switch = self
            .document
            .parent(id)
            .filter(|_| self.parent_is_switch(id))
            .ok_or_else(|| {
                self.error(
                    ErrorKind::CaseOutsideSwitch,
                    "<case> must be a direct child of <switch>",
                    &info.location,
                )
            })?;
        let branch = self.switches.enter_case(switch).map_err(|_| {
            self.error(
                ErrorKind::CaseAfterDefault,
                "<case> must not be placed after <default>",
                &info.location,
            )
        })?;
        let params = TagParams::new(&info.attrs);
        let test = self.require(&params, "test", info)?;

        let body = self.compile_children(id, sink)?;
        if flow == Flow::Applied {
            self.restore_applied_cursor(id);
        }

        let test = self.attr_part(test, ExprContext::Condition, &info.location)?;
        let head = match branch {
            CaseBranch::Open => statement(code!["if (", test, ") {"]),
            CaseBranch::Chain => statement(code!["} else if (", test, ") {"]),
        };
        Ok(code![head, body])
    }

    fn default(&mut self, id: NodeId, info: &TagInfo, flow: Flow, sink: u32) -> Result<Code, CompilerError> {
        if flow == Flow::Content {
            self.clone_into_fragment(id, &info.name);
        }
        let switch = self
            .document
            .parent(id)
            .filter(|_| self.parent_is_switch(id))
            .ok_or_else(|| {
                self.error(
                    ErrorKind::DefaultOutsideSwitch,
                    "<default> must be a direct child of <switch>",
                    &info.location,
                )
            })?;
        let branch = self.switches.enter_default(switch);

        let body = self.compile_children(id, sink)?;
        if flow == Flow::Applied {
            self.restore_applied_cursor(id);
        }

        Ok(match branch {
            DefaultBranch::Only => body,
            DefaultBranch::Else => code![statement(code!["} else {"]), body],
        })
    }

    fn import(&mut self, info: &TagInfo) -> Result<Code, CompilerError> {
        let params = TagParams::new(&info.attrs);
        let name = self.require(&params, "name", info)?;
        let from = self.require(&params, "from", info)?;

        let component = name
            .as_static_str()
            .filter(|name| name.contains('-'))
            .ok_or_else(|| {
                self.error(
                    ErrorKind::InvalidComponentName,
                    "component name must be a literal string containing a dash (`-`)",
                    &info.location,
                )
            })?;
        self.registry.register(component);
        debug!(component, "registered component");

        let from = self.attr_part(from, ExprContext::Value, &info.location)?;
        Ok(statement(code![
            COMPONENTS,
            "[",
            php_string(component),
            "] = include(__DIR__ . \"/\" . ",
            from,
            " . ",
            php_string(&self.options.component_extension),
            ");"
        ]))
    }

    fn component(&mut self, id: NodeId, info: &TagInfo, component: &str, sink: u32) -> Result<Code, CompilerError> {
        let fragment = self.fragments.link(&mut self.document, id);
        let result = self.literal_tag_parts(id, info, fragment, sink);
        self.fragments.unlink(id);
        let (mut out, children) = result?;

        let f = self.document.node(fragment).identity;
        let n = info.identity;
        let children_arg = if self.is_single_tag(info) {
            code!["[]"]
        } else {
            out.append(statement(code!["$children", n, " = [];"]));
            out.append(children);
            code!["$children", n]
        };
        out.append(statement(code![
            "$result",
            n,
            " = ",
            COMPONENTS,
            "[",
            php_string(component),
            "]($attrs",
            f,
            ", ",
            children_arg,
            ", true, ",
            STATE,
            ");"
        ]));
        out.append(statement(code![
            "foreach ($result",
            n,
            " as $item",
            n,
            ") { $children",
            sink,
            "[] = $item",
            n,
            "; }"
        ]));
        Ok(out)
    }

    fn template(&mut self, id: NodeId, info: &TagInfo) -> Result<Code, CompilerError> {
        let params = TagParams::new(&info.attrs);
        let name = self.require(&params, "name", info)?;
        if info.is_single {
            return Err(self.error(
                ErrorKind::SelfClosingTemplate,
                "<template> must not be a self-closing tag",
                &info.location,
            ));
        }

        let n = info.identity;
        let body = self.compile_children(id, n)?;
        let target = self.target(name, ExprContext::Target { promote: true }, &info.location)?;
        Ok(code![
            statement(code!["$children", n, " = [];"]),
            body,
            statement(code![target, " = $children", n, ";"])
        ])
    }

    fn use_state(&mut self, info: &TagInfo) -> Result<Code, CompilerError> {
        let params = TagParams::new(&info.attrs);
        let name = self.require(&params, "name", info)?;
        if !info.is_single {
            return Err(self.error(
                ErrorKind::StateTagNotSingle,
                "<use-state> must be a self-closing tag",
                &info.location,
            ));
        }
        let state_name = match name {
            AttrPart::Expression {
                expr: Expr::Var { name, keys },
            } if keys.is_empty() => name.clone(),
            _ => {
                return Err(self.error(
                    ErrorKind::StateNameNotBare,
                    "<use-state> name must be a bare variable",
                    &info.location,
                ))
            }
        };

        let target = self.target(name, ExprContext::Target { promote: true }, &info.location)?;
        let default = match params.get("value") {
            Some(value) => self.attr_part(value, ExprContext::Value, &info.location)?,
            None => code!["null"],
        };
        let slot = code![STATE, "[", php_string(&state_name), "]"];
        Ok(statement(code![
            target,
            " = isset(",
            &slot,
            ") ? ",
            slot,
            " : ",
            default,
            ";"
        ]))
    }

    fn include(&mut self, id: NodeId, info: &TagInfo, sink: u32) -> Result<Code, CompilerError> {
        let params = TagParams::new(&info.attrs);
        let from = self.require(&params, "from", info)?;
        let from = from.as_static_str().ok_or_else(|| {
            self.error(
                ErrorKind::DynamicInclude,
                "<include> path must be a literal string",
                &info.location,
            )
        })?;

        let base = self
            .files
            .last()
            .and_then(|file| file.parent())
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let path = normalize(&base.join(from));
        if self.files.contains(&path) {
            return Err(self.error(
                ErrorKind::IncludeCycle,
                format!("include cycle through {}", path.display()),
                &info.location,
            ));
        }

        let template = self.loader.load(&path).map_err(|e| {
            self.error(
                ErrorKind::IncludeFailed,
                format!("failed to include {}: {}", path.display(), e),
                &info.location,
            )
        })?;
        debug!(path = %path.display(), nodes = template.nodes.len(), "inlining template");

        let parent = self.document.parent(id);
        let roots = self.document.import_fresh(&template.nodes, parent);
        self.document.splice(id, &roots);

        self.files.push(path);
        let out = self.compile_nodes(&roots, sink);
        self.files.pop();
        out
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// EMISSION HELPERS
// ═══════════════════════════════════════════════════════════════════════════════

/// `$childrenN[] = ["text" => "..."];`
fn record(sink: u32, key: &str, value: &str) -> Code {
    statement(code![
        "$children",
        sink,
        "[] = [",
        php_string(key),
        " => ",
        php_string(value),
        "];"
    ])
}

/// Appends a record, a list of records, or a text record for a scalar.
fn expression_block(identity: u32, sink: u32, value: Code) -> Code {
    let result = format!("$result{}", identity);
    let item = format!("$item{}", identity);
    let children = format!("$children{}", sink);
    statement(code![
        &result, " = ", value, ";\n",
        "if (is_array(", &result, ")) {\n",
        "  if (isset(", &result, "[\"tag\"]) || isset(", &result, "[\"text\"]) || isset(",
        &result, "[\"comment\"]) || isset(", &result, "[\"script\"])) {\n",
        "    ", &children, "[] = ", &result, ";\n",
        "  } else {\n",
        "    foreach (", &result, " as ", &item, ") {\n",
        "      ", &children, "[] = ", &item, ";\n",
        "    }\n",
        "  }\n",
        "} else {\n",
        "  ", &children, "[] = [\"text\" => ", &result, "];\n",
        "}"
    ])
}

/// Lexically resolve `.` and `..` so include paths compare reliably.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
