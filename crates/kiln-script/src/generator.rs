//! Bundle emission.

use oxc_allocator::Allocator;
use oxc_codegen::{Codegen, CodegenOptions, CommentOptions};
use oxc_mangler::MangleOptions;
use oxc_minifier::{CompressOptions, Minifier, MinifierOptions};
use oxc_parser::Parser;
use oxc_span::SourceType;

use crate::bundler::{BundleMode, Module};
use crate::module::quote;
use crate::transform::join_diagnostics;
use crate::BundleError;

/// Module registry runtime shared by every bundle.
const RUNTIME: &str = r#"  var __kiln_cache = {};
  function __kiln_export(target, name, getter) {
    Object.defineProperty(target, name, { enumerable: true, get: getter });
  }
  function __kiln_default(mod) {
    return mod && mod.__esModule ? mod["default"] : mod;
  }
  function __kiln_reexport(target, source) {
    Object.keys(source).forEach(function (key) {
      if (key !== "default" && !Object.prototype.hasOwnProperty.call(target, key)) {
        __kiln_export(target, key, function () { return source[key]; });
      }
    });
  }
  function __kiln_require(id) {
    if (__kiln_cache[id]) {
      return __kiln_cache[id].exports;
    }
    var entry = __kiln_modules[id];
    var module = (__kiln_cache[id] = { exports: {} });
    entry[0].call(module.exports, module, module.exports, function (request) {
      var target = entry[1][request];
      if (target === undefined) {
        throw new Error("Cannot find module '" + request + "' from '" + id + "'");
      }
      return __kiln_require(target);
    });
    return module.exports;
  }
"#;

/// Render modules into a self-executing bundle.
pub fn render_bundle(modules: &[Module], entry_id: &str, mode: BundleMode) -> String {
    let mut out = String::from("(function () {\n  var __kiln_modules = {\n");

    for module in modules {
        let body = match mode {
            BundleMode::Development => {
                let with_url = format!("{}\n//# sourceURL=kiln:///{}", module.code, module.id);
                format!("eval({});", quote(&with_url))
            }
            BundleMode::Production => module.code.clone(),
        };

        let dependencies = module
            .dependencies
            .iter()
            .map(|(request, id)| format!("{}: {}", quote(request), quote(id)))
            .collect::<Vec<_>>()
            .join(", ");

        out.push_str(&format!(
            "{}: [function (module, exports, require) {{\n{}\n}}, {{{}}}],\n",
            quote(&module.id),
            body,
            dependencies
        ));
    }

    out.push_str("  };\n");
    out.push_str(RUNTIME);
    out.push_str(&format!("  __kiln_require({});\n}})();\n", quote(entry_id)));
    out
}

/// Minify and mangle a rendered bundle.
pub fn minify_bundle(code: &str) -> Result<String, BundleError> {
    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, code, SourceType::cjs()).parse();
    if ret.panicked || !ret.errors.is_empty() {
        return Err(BundleError::Parse {
            path: "<bundle>".into(),
            message: join_diagnostics(&ret.errors),
        });
    }

    let mut program = ret.program;
    let options = MinifierOptions {
        mangle: Some(MangleOptions::default()),
        compress: Some(CompressOptions::smallest()),
    };
    let ret = Minifier::new(options).minify(&allocator, &mut program);

    Ok(Codegen::new()
        .with_options(CodegenOptions {
            minify: true,
            comments: CommentOptions::disabled(),
            ..CodegenOptions::default()
        })
        .with_scoping(ret.scoping)
        .build(&program)
        .code)
}
