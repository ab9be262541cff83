//! ES module rewriting.
//!
//! Import and export statements are replaced (by source span) with calls into
//! the bundle's module registry. Module requests are hoisted to the top of
//! the module, and every reference to an imported binding becomes a read of
//! the required module, so imports stay live. Exports become getters on
//! `exports`. `require("...")` calls with a literal argument are collected in
//! both ES and CommonJS modules.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use oxc_allocator::Allocator;
use oxc_ast::ast::{
    Argument, CallExpression, ExportDefaultDeclarationKind, ExportNamedDeclaration, Expression,
    IdentifierReference, ImportDeclaration, ImportDeclarationSpecifier, ObjectProperty, Statement,
};
use oxc_ast_visit::{walk, Visit};
use oxc_ecmascript::BoundNames;
use oxc_parser::Parser;
use oxc_semantic::{Scoping, SemanticBuilder, SymbolId};
use oxc_span::{GetSpan, SourceType, Span};

use crate::transform::join_diagnostics;
use crate::BundleError;

/// A module after import/export rewriting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewrittenModule {
    /// Module body, free of import/export statements
    pub code: String,

    /// Specifiers this module requires, in source order, deduplicated
    pub requests: Vec<String>,

    /// Whether the source used ES module syntax
    pub is_esm: bool,
}

/// A pending source replacement.
struct Edit {
    span: Span,
    text: String,
}

/// Rewrite the import/export statements of a module.
pub fn rewrite_module(source: &str, path: &Path) -> Result<RewrittenModule, BundleError> {
    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, source, SourceType::unambiguous()).parse();
    if ret.panicked || !ret.errors.is_empty() {
        return Err(BundleError::Parse {
            path: path.to_path_buf(),
            message: join_diagnostics(&ret.errors),
        });
    }

    let program = ret.program;
    let scoping = SemanticBuilder::new()
        .build(&program)
        .semantic
        .into_scoping();

    let mut edits: Vec<Edit> = Vec::new();
    let mut hoisted: Vec<String> = Vec::new();
    let mut exports: Vec<(String, String)> = Vec::new();
    let mut requests: Vec<String> = Vec::new();
    let mut imports: HashMap<SymbolId, String> = HashMap::new();
    let mut imported_names: HashMap<String, String> = HashMap::new();
    let mut is_esm = false;
    let mut bindings = 0usize;
    let mut next_binding = || {
        bindings += 1;
        format!("__kiln_m{bindings}")
    };

    for stmt in &program.body {
        match stmt {
            Statement::ImportDeclaration(decl) => {
                is_esm = true;
                let request = decl.source.value.to_string();
                let binding = next_binding();
                hoisted.push(format!("var {binding} = require({});", quote(&request)));

                if let Some(specifiers) = &decl.specifiers {
                    for spec in specifiers {
                        let (local, expr) = match spec {
                            ImportDeclarationSpecifier::ImportSpecifier(s) => (
                                &s.local,
                                format!("{binding}[{}]", quote(s.imported.name().as_str())),
                            ),
                            ImportDeclarationSpecifier::ImportDefaultSpecifier(s) => {
                                (&s.local, format!("__kiln_default({binding})"))
                            }
                            ImportDeclarationSpecifier::ImportNamespaceSpecifier(s) => {
                                (&s.local, binding.clone())
                            }
                        };
                        imports.insert(local.symbol_id(), expr.clone());
                        imported_names.insert(local.name.to_string(), expr);
                    }
                }

                requests.push(request);
                edits.push(Edit {
                    span: decl.span,
                    text: String::new(),
                });
            }

            Statement::ExportNamedDeclaration(decl) => {
                is_esm = true;

                if let Some(source_literal) = &decl.source {
                    let request = source_literal.value.to_string();
                    let binding = next_binding();
                    for spec in &decl.specifiers {
                        exports.push((
                            spec.exported.name().to_string(),
                            format!("{binding}[{}]", quote(spec.local.name().as_str())),
                        ));
                    }
                    hoisted.push(format!("var {binding} = require({});", quote(&request)));
                    edits.push(Edit {
                        span: decl.span,
                        text: String::new(),
                    });
                    requests.push(request);
                } else if let Some(declaration) = &decl.declaration {
                    // `export const a = 1` keeps the declaration, drops `export`
                    edits.push(Edit {
                        span: Span::new(decl.span.start, declaration.span().start),
                        text: String::new(),
                    });
                    declaration.bound_names(&mut |ident| {
                        exports.push((ident.name.to_string(), ident.name.to_string()));
                    });
                } else {
                    for spec in &decl.specifiers {
                        exports.push((
                            spec.exported.name().to_string(),
                            spec.local.name().to_string(),
                        ));
                    }
                    edits.push(Edit {
                        span: decl.span,
                        text: String::new(),
                    });
                }
            }

            Statement::ExportDefaultDeclaration(decl) => {
                is_esm = true;
                let inner = decl.declaration.span();
                let prefix = Span::new(decl.span.start, inner.start);

                let named = match &decl.declaration {
                    ExportDefaultDeclarationKind::FunctionDeclaration(f) => {
                        f.id.as_ref().map(|id| id.name.to_string())
                    }
                    ExportDefaultDeclarationKind::ClassDeclaration(c) => {
                        c.id.as_ref().map(|id| id.name.to_string())
                    }
                    _ => None,
                };

                match named {
                    Some(name) => {
                        edits.push(Edit {
                            span: prefix,
                            text: String::new(),
                        });
                        exports.push(("default".to_string(), name));
                    }
                    None => {
                        edits.push(Edit {
                            span: prefix,
                            text: "exports[\"default\"] = ".to_string(),
                        });
                        let text = &source[decl.span.start as usize..decl.span.end as usize];
                        if !text.trim_end().ends_with(';') {
                            edits.push(Edit {
                                span: Span::new(decl.span.end, decl.span.end),
                                text: ";".to_string(),
                            });
                        }
                    }
                }
            }

            Statement::ExportAllDeclaration(decl) => {
                is_esm = true;
                let request = decl.source.value.to_string();
                let binding = next_binding();
                let mut code = format!("var {binding} = require({});", quote(&request));

                match &decl.exported {
                    Some(name) => exports.push((name.name().to_string(), binding)),
                    None => code.push_str(&format!(" __kiln_reexport(exports, {binding});")),
                }

                hoisted.push(code);
                requests.push(request);
                edits.push(Edit {
                    span: decl.span,
                    text: String::new(),
                });
            }

            _ => {}
        }
    }

    let mut references = References {
        scoping: &scoping,
        imports: &imports,
        edits: Vec::new(),
        requires: Vec::new(),
    };
    references.visit_program(&program);
    edits.extend(references.edits);
    requests.extend(references.requires);

    let mut code = apply_edits(source, edits);

    if is_esm {
        let mut header =
            String::from("\"use strict\";\nObject.defineProperty(exports, \"__esModule\", { value: true });\n");
        for (name, expr) in &exports {
            // `export { x }` of an imported `x` forwards the live binding
            let expr = imported_names.get(expr).unwrap_or(expr);
            header.push_str(&format!(
                "__kiln_export(exports, {}, function () {{ return {expr}; }});\n",
                quote(name)
            ));
        }
        for line in &hoisted {
            header.push_str(line);
            header.push('\n');
        }
        code.insert_str(0, &header);
    }

    let mut seen = HashSet::new();
    requests.retain(|r| seen.insert(r.clone()));

    Ok(RewrittenModule {
        code,
        requests,
        is_esm,
    })
}

/// Rewrites references to imported bindings and collects `require` calls.
struct References<'s> {
    scoping: &'s Scoping,
    imports: &'s HashMap<SymbolId, String>,
    edits: Vec<Edit>,
    requires: Vec<String>,
}

impl References<'_> {
    fn imported(&self, ident: &IdentifierReference) -> Option<String> {
        self.scoping
            .get_reference(ident.reference_id())
            .symbol_id()
            .and_then(|id| self.imports.get(&id))
            .cloned()
    }

    fn is_unbound(&self, ident: &IdentifierReference) -> bool {
        self.scoping
            .get_reference(ident.reference_id())
            .symbol_id()
            .is_none()
    }
}

impl<'a> Visit<'a> for References<'_> {
    fn visit_import_declaration(&mut self, _it: &ImportDeclaration<'a>) {}

    fn visit_export_named_declaration(&mut self, it: &ExportNamedDeclaration<'a>) {
        // Specifier lists are replaced whole
        if let Some(declaration) = &it.declaration {
            self.visit_declaration(declaration);
        }
    }

    fn visit_call_expression(&mut self, it: &CallExpression<'a>) {
        if let Expression::Identifier(callee) = &it.callee {
            if callee.name == "require" && self.is_unbound(callee) {
                if let (1, Some(Argument::StringLiteral(literal))) =
                    (it.arguments.len(), it.arguments.first())
                {
                    self.requires.push(literal.value.to_string());
                }
            } else if let Some(expr) = self.imported(callee) {
                // Called without the module object as `this`
                self.edits.push(Edit {
                    span: callee.span,
                    text: format!("(0, {expr})"),
                });
                for argument in &it.arguments {
                    self.visit_argument(argument);
                }
                return;
            }
        }
        walk::walk_call_expression(self, it);
    }

    fn visit_object_property(&mut self, it: &ObjectProperty<'a>) {
        if it.shorthand {
            if let Expression::Identifier(ident) = &it.value {
                if let Some(expr) = self.imported(ident) {
                    self.edits.push(Edit {
                        span: ident.span,
                        text: format!("{}: {expr}", ident.name),
                    });
                    return;
                }
            }
        }
        walk::walk_object_property(self, it);
    }

    fn visit_identifier_reference(&mut self, it: &IdentifierReference<'a>) {
        if let Some(expr) = self.imported(it) {
            self.edits.push(Edit {
                span: it.span,
                text: expr,
            });
        }
    }
}

/// Wrap a JSON document as a CommonJS module.
pub fn json_module(source: &str, path: &Path) -> Result<RewrittenModule, BundleError> {
    serde_json::from_str::<serde_json::Value>(source).map_err(|e| BundleError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    Ok(RewrittenModule {
        code: format!("module.exports = {};", source.trim()),
        requests: Vec::new(),
        is_esm: false,
    })
}

fn apply_edits(source: &str, mut edits: Vec<Edit>) -> String {
    edits.sort_by(|a, b| b.span.start.cmp(&a.span.start).then(b.span.end.cmp(&a.span.end)));

    let mut out = source.to_string();
    for edit in edits {
        out.replace_range(edit.span.start as usize..edit.span.end as usize, &edit.text);
    }
    out
}

/// JavaScript string literal for `value`.
pub(crate) fn quote(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| format!("\"{value}\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rewrite(source: &str) -> RewrittenModule {
        rewrite_module(source, Path::new("test.js")).unwrap()
    }

    #[test]
    fn rewrites_default_and_named_imports() {
        let out = rewrite("console.log(divide(4, 2), r);\nimport divide, { round as r } from \"./lib.js\";\n");

        assert!(out.is_esm);
        assert_eq!(out.requests, vec!["./lib.js"]);
        assert!(out.code.contains("var __kiln_m1 = require(\"./lib.js\");\nconsole.log("));
        assert!(out
            .code
            .contains("console.log((0, __kiln_default(__kiln_m1))(4, 2), __kiln_m1[\"round\"]);"));
        assert!(!out.code.contains("import "));
    }

    #[test]
    fn rewrites_side_effect_and_namespace_imports() {
        let out = rewrite("import \"core-js/features/promise\";\nimport * as lib from \"./lib\";\nlib.run();\n");

        assert_eq!(out.requests, vec!["core-js/features/promise", "./lib"]);
        assert!(out.code.contains("var __kiln_m1 = require(\"core-js/features/promise\");"));
        assert!(out.code.contains("var __kiln_m2 = require(\"./lib\");"));
        assert!(out.code.contains("__kiln_m2.run();"));
    }

    #[test]
    fn imported_bindings_stay_live() {
        let out = rewrite(
            "import { count, inc } from \"./counter\";\ninc();\nconsole.log(\"live count\", count);\n",
        );

        assert!(out.code.contains("(0, __kiln_m1[\"inc\"])();"));
        assert!(out
            .code
            .contains("console.log(\"live count\", __kiln_m1[\"count\"]);"));
        assert!(!out.code.contains("var count"));
    }

    #[test]
    fn leaves_shadowing_locals_alone() {
        let out = rewrite(
            "import { value } from \"./a\";\nfunction f(value) { return value; }\nvar o = { value };\n",
        );

        assert!(out.code.contains("function f(value) { return value; }"));
        assert!(out.code.contains("var o = { value: __kiln_m1[\"value\"] };"));
    }

    #[test]
    fn forwards_imported_bindings_in_export_lists() {
        let out = rewrite("import { a } from \"./a\";\nexport { a as b };\n");

        assert!(out
            .code
            .contains("__kiln_export(exports, \"b\", function () { return __kiln_m1[\"a\"]; });"));
    }

    #[test]
    fn exports_declarations_as_getters() {
        let out = rewrite("export const a = 1, b = 2;\nexport function f() {}\n");

        assert!(out.code.contains("const a = 1, b = 2;"));
        assert!(out.code.contains("function f() {}"));
        assert!(!out.code.contains("export "));
        assert!(out
            .code
            .contains("__kiln_export(exports, \"a\", function () { return a; });"));
        assert!(out
            .code
            .contains("__kiln_export(exports, \"f\", function () { return f; });"));
    }

    #[test]
    fn exports_default_expressions() {
        let out = rewrite("export default function (a, b) { return a / b; }\n");

        assert!(out
            .code
            .contains("exports[\"default\"] = function (a, b) { return a / b; };"));
    }

    #[test]
    fn exports_named_default_declarations() {
        let out = rewrite("export default function divide(a, b) { return a / b; }\n");

        assert!(out.code.contains("function divide(a, b)"));
        assert!(out
            .code
            .contains("__kiln_export(exports, \"default\", function () { return divide; });"));
    }

    #[test]
    fn rewrites_export_lists_and_reexports() {
        let out = rewrite("const x = 1;\nexport { x as y };\nexport * from \"./more\";\n");

        assert!(out
            .code
            .contains("__kiln_export(exports, \"y\", function () { return x; });"));
        assert!(out.code.contains("__kiln_reexport(exports, __kiln_m1);"));
        assert_eq!(out.requests, vec!["./more"]);
    }

    #[test]
    fn scans_commonjs_requires() {
        let out = rewrite("var $ = require('jquery');\nvar a = require(\"./a\");\nmodule.exports = $;\n");

        assert!(!out.is_esm);
        assert_eq!(out.requests, vec!["jquery", "./a"]);
        assert!(out.code.starts_with("var $ = require('jquery');"));
    }

    #[test]
    fn ignores_requires_in_comments_and_strings() {
        let out = rewrite(
            "// e.g. var x = require(\"optional-peer\");\nvar s = \"require('nope')\";\nvar a = require(\"./a\");\n",
        );

        assert_eq!(out.requests, vec!["./a"]);
    }

    #[test]
    fn ignores_dynamic_and_local_requires() {
        let out = rewrite(
            "var name = \"x\";\nrequire(name);\nfunction load(require) { return require(\"./local\"); }\n",
        );

        assert!(out.requests.is_empty());
    }

    #[test]
    fn collects_requires_in_es_modules() {
        let out = rewrite("import a from \"./a\";\nconst b = require(\"./b\");\nexport default a + b;\n");

        assert!(out.is_esm);
        assert_eq!(out.requests, vec!["./a", "./b"]);
    }

    #[test]
    fn reports_syntax_errors() {
        let result = rewrite_module("import {", Path::new("bad.js"));

        assert!(matches!(result, Err(BundleError::Parse { .. })));
    }

    #[test]
    fn wraps_json() {
        let out = json_module("{\"a\": 1}\n", Path::new("data.json")).unwrap();

        assert_eq!(out.code, "module.exports = {\"a\": 1};");
    }
}
