#[cfg(test)]
mod tests {
    use crate::compiler::{compile_json, compile_with_loader, CompileOptions};
    use crate::registry::RegistryScope;
    use crate::test_support::*;
    use crate::validate::ErrorKind;
    use serde_json::json;

    const PROLOGUE: &str = "<?php\n\nreturn function ($__data = [], $__children = [], $__isComponent = false, $__state = []) {\n$__scope = [];\n$__components = [];\n$children0 = [];\n?>\n";
    const EPILOGUE: &str = "<?php\nreturn $children0;\n};\n";

    fn body(output: &str) -> &str {
        output
            .strip_prefix(PROLOGUE)
            .and_then(|rest| rest.strip_suffix(EPILOGUE))
            .unwrap()
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // RECORDS
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_text_at_root() {
        let out = compile_ok(json!([text(1, "hello \"world\"")]));
        assert_eq!(
            body(&out),
            "<?php $children0[] = [\"text\" => \"hello \\\"world\\\"\"]; ?>\n"
        );
    }

    #[test]
    fn test_empty_template() {
        let out = compile_ok(json!([]));
        assert_eq!(out, format!("{}{}", PROLOGUE, EPILOGUE));
    }

    #[test]
    fn test_comment_string_and_script_records() {
        let out = compile_ok(json!([
            { "type": "comment", "id": 1, "value": " note " },
            { "type": "string", "id": 2, "value": "raw" },
            {
                "type": "script", "id": 3,
                "attrs": [attr("type", lit("module"))],
                "body": "let a = \"$b\";"
            }
        ]));
        assert_eq!(
            body(&out),
            concat!(
                "<?php $children0[] = [\"comment\" => \" note \"]; ?>\n",
                "<?php $children0[] = [\"text\" => \"raw\"]; ?>\n",
                "<?php $attrs1 = []; ?>\n",
                "<?php $attrs1[\"type\"] = \"module\"; ?>\n",
                "<?php $children0[] = [\"script\" => [\"attrs\" => $attrs1, \"body\" => \"let a = \\\"\\$b\\\";\"]]; ?>\n",
            )
        );
    }

    #[test]
    fn test_literal_tag_with_children() {
        let out = compile_ok(json!([tag(
            1,
            "a",
            json!([attr("href", lit("/home")), flag("download")]),
            json!([text(2, "Home")])
        )]));
        assert_eq!(
            body(&out),
            concat!(
                "<?php $attrs1 = []; ?>\n",
                "<?php $attrs1[\"href\"] = \"/home\"; ?>\n",
                "<?php $attrs1[\"download\"] = false; ?>\n",
                "<?php $children1 = []; ?>\n",
                "<?php $children1[] = [\"text\" => \"Home\"]; ?>\n",
                "<?php $children0[] = [\"tag\" => \"a\", \"attrs\" => $attrs1, \"children\" => $children1]; ?>\n",
            )
        );
    }

    #[test]
    fn test_single_tags_have_no_children_key() {
        let out = compile_ok(json!([
            single(1, "!DOCTYPE", json!([flag("html")])),
            tag(2, "input", json!([attr("value", logic(var("v")))]), json!([])),
            single(3, "br", json!([]))
        ]));
        let body = body(&out);
        assert!(body.contains("$children0[] = [\"tag\" => \"!DOCTYPE\", \"attrs\" => $attrs1];"));
        assert!(body.contains("$children0[] = [\"tag\" => \"input\", \"attrs\" => $attrs2];"));
        assert!(body.contains("$children0[] = [\"tag\" => \"br\", \"attrs\" => $attrs3];"));
        assert!(!body.contains("\"children\" =>"));
    }

    #[test]
    fn test_configured_single_tags() {
        let options = CompileOptions {
            single_tags: vec!["img".to_string()],
            registry_scope: RegistryScope::Session,
            ..CompileOptions::default()
        };
        let nodes = json!([
            tag(1, "img", json!([]), json!([])),
            tag(2, "input", json!([]), json!([]))
        ]);
        let out = compile_with_loader(&template(nodes), &options, &MemoryLoader::new()).unwrap();
        assert!(out.contains("[\"tag\" => \"img\", \"attrs\" => $attrs1];"));
        assert!(out.contains("[\"tag\" => \"input\", \"attrs\" => $attrs2, \"children\" => $children2];"));
    }

    #[test]
    fn test_expression_block_appends_records() {
        let out = compile_ok(json!([block(4, var("items"))]));
        assert_eq!(
            body(&out),
            concat!(
                "<?php $result4 = $__data[\"items\"];\n",
                "if (is_array($result4)) {\n",
                "  if (isset($result4[\"tag\"]) || isset($result4[\"text\"]) || isset($result4[\"comment\"]) || isset($result4[\"script\"])) {\n",
                "    $children0[] = $result4;\n",
                "  } else {\n",
                "    foreach ($result4 as $item4) {\n",
                "      $children0[] = $item4;\n",
                "    }\n",
                "  }\n",
                "} else {\n",
                "  $children0[] = [\"text\" => $result4];\n",
                "} ?>\n",
            )
        );
    }

    #[test]
    fn test_determinism() {
        let nodes = json!([
            single(1, "variable", json!([attr("name", logic(var("n"))), attr("value", logic(num(3)))])),
            tag(2, "ul", json!([attr("class", lit("list"))]), json!([
                tag(3, "for-each", json!([
                    attr("from", logic(json!({ "type": "range", "kind": "open", "start": num(0), "end": var("n") }))),
                    attr("item", logic(var("i")))
                ]), json!([
                    tag(4, "li", json!([]), json!([block(5, var("i"))]))
                ]))
            ]))
        ]);
        assert_eq!(compile_ok(nodes.clone()), compile_ok(nodes));
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // SCOPE
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_unassigned_names_read_data() {
        let out = compile_ok(json!([block(1, var("title"))]));
        assert!(out.contains("$result1 = $__data[\"title\"];"));
        assert!(!out.contains("$__scope[\"title\"]"));
    }

    #[test]
    fn test_assignment_promotes_every_reference() {
        let out = compile_ok(json!([
            block(1, var("title")),
            single(2, "variable", json!([attr("name", logic(var("title"))), attr("value", lit("Home"))])),
            block(3, var("title"))
        ]));
        assert!(out.contains("$result1 = $__scope[\"title\"];"));
        assert!(out.contains("<?php $__scope[\"title\"] = \"Home\"; ?>\n"));
        assert!(out.contains("$result3 = $__scope[\"title\"];"));
        assert!(!out.contains("$__data[\"title\"]"));
    }

    #[test]
    fn test_param_targets_data_and_does_not_promote() {
        let out = compile_ok(json!([
            single(1, "param", json!([attr("name", logic(var("size"))), attr("value", logic(num(10)))])),
            block(2, var("size"))
        ]));
        assert!(out.contains("<?php if (!isset($__data[\"size\"])) $__data[\"size\"] = 10; ?>\n"));
        assert!(out.contains("$result2 = $__data[\"size\"];"));
    }

    #[test]
    fn test_variable_with_literal_name() {
        let out = compile_ok(json!([single(
            1,
            "variable",
            json!([attr("name", lit("count")), attr("value", logic(num(1)))])
        )]));
        assert!(out.contains("<?php $__scope[\"count\"] = 1; ?>\n"));
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // CONTROL FLOW
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_if_wraps_children() {
        let out = compile_ok(json!([tag(
            1,
            "if",
            json!([attr("test", logic(var("show")))]),
            json!([text(2, "yes")])
        )]));
        assert_eq!(
            body(&out),
            concat!(
                "<?php if ($__data[\"show\"]) { ?>\n",
                "<?php $children0[] = [\"text\" => \"yes\"]; ?>\n",
                "<?php } ?>\n",
            )
        );
    }

    #[test]
    fn test_empty_if_emits_nothing() {
        let out = compile_ok(json!([tag(1, "if", json!([attr("test", logic(var("x")))]), json!([]))]));
        assert_eq!(body(&out), "");
    }

    #[test]
    fn test_for_each_with_key() {
        let out = compile_ok(json!([tag(
            1,
            "for-each",
            json!([
                attr("from", logic(var("rows"))),
                attr("key", logic(var("k"))),
                attr("item", logic(var("row")))
            ]),
            json!([block(2, var_keys("row", json!([var("k")])))])
        )]));
        assert!(out.contains("<?php foreach ($__data[\"rows\"] as $__scope[\"k\"] => $__scope[\"row\"]) { ?>\n"));
        assert!(out.contains("$result2 = $__scope[\"row\"][$__scope[\"k\"]];"));
    }

    #[test]
    fn test_switch_case_case_default() {
        let out = compile_ok(json!([tag(1, "switch", json!([]), json!([
            text(2, "\n  "),
            tag(3, "case", json!([attr("test", logic(var("a")))]), json!([text(4, "A")])),
            tag(5, "case", json!([attr("test", logic(var("b")))]), json!([text(6, "B")])),
            tag(7, "default", json!([]), json!([text(8, "C")]))
        ]))]));
        assert_eq!(
            body(&out),
            concat!(
                "<?php if ($__data[\"a\"]) { ?>\n",
                "<?php $children0[] = [\"text\" => \"A\"]; ?>\n",
                "<?php } else if ($__data[\"b\"]) { ?>\n",
                "<?php $children0[] = [\"text\" => \"B\"]; ?>\n",
                "<?php } else { ?>\n",
                "<?php $children0[] = [\"text\" => \"C\"]; ?>\n",
                "<?php } ?>\n",
            )
        );
    }

    #[test]
    fn test_switch_with_only_default_is_unwrapped() {
        let out = compile_ok(json!([tag(1, "switch", json!([]), json!([
            tag(2, "default", json!([]), json!([text(3, "C")]))
        ]))]));
        assert_eq!(body(&out), "<?php $children0[] = [\"text\" => \"C\"]; ?>\n");
    }

    #[test]
    fn test_case_after_default_fails() {
        let err = compile_err(json!([tag(1, "switch", json!([]), json!([
            tag(2, "case", json!([attr("test", logic(var("a")))]), json!([text(3, "A")])),
            tag(4, "default", json!([]), json!([text(5, "C")])),
            tag(6, "case", json!([attr("test", logic(var("b")))]), json!([text(7, "B")]))
        ]))]));
        assert_eq!(err.kind, ErrorKind::CaseAfterDefault);
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // ATTRIBUTE FRAGMENTS
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_for_each_attribute_applies_per_iteration() {
        let out = compile_ok(json!([tag(1, "div", json!([]), json!([
            tag(2, "for-each", json!([
                attr("from", logic(json!({ "type": "range", "kind": "closed", "start": num(0), "end": num(3) }))),
                attr("item", logic(var("i")))
            ]), json!([
                single(3, "attribute", json!([
                    attr("name", logic(json!({ "type": "concat", "values": [string("data-index"), var("i")] }))),
                    attr("value", logic(var("i")))
                ]))
            ]))
        ]))]));
        assert!(out.contains(concat!(
            "<?php $attrs1 = []; ?>\n",
            "<?php foreach (mkArr(0, 3, MKARR_CLOSE) as $__scope[\"i\"]) { ?>\n",
            "<?php $attrs1[\"data-index\" . $__scope[\"i\"]] = $__scope[\"i\"]; ?>\n",
            "<?php } ?>\n",
        )));
        assert!(out.contains(
            "<?php $children0[] = [\"tag\" => \"div\", \"attrs\" => $attrs1, \"children\" => $children1]; ?>\n"
        ));
    }

    #[test]
    fn test_literal_attributes_follow_fragment() {
        let out = compile_ok(json!([tag(1, "button", json!([attr("class", lit("btn"))]), json!([
            tag(2, "if", json!([attr("test", logic(var("active")))]), json!([
                single(3, "attribute", json!([attr("name", lit("class")), attr("value", lit("btn active"))]))
            ])),
            text(4, "Go")
        ]))]));
        assert!(out.contains(concat!(
            "<?php $attrs1 = []; ?>\n",
            "<?php if ($__data[\"active\"]) { ?>\n",
            "<?php $attrs1[\"class\"] = \"btn active\"; ?>\n",
            "<?php } ?>\n",
            "<?php $attrs1[\"class\"] = \"btn\"; ?>\n",
            "<?php $children1 = []; ?>\n",
        )));
        assert!(out.contains("<?php $children1[] = [\"text\" => \"Go\"]; ?>\n"));
    }

    #[test]
    fn test_direct_attribute_has_no_control_flow() {
        let out = compile_ok(json!([tag(1, "p", json!([]), json!([
            single(2, "attribute", json!([attr("name", lit("id")), attr("value", logic(var("id")))]))
        ]))]));
        assert!(out.contains("<?php $attrs1 = []; ?>\n<?php $attrs1[\"id\"] = $__data[\"id\"]; ?>\n"));
    }

    #[test]
    fn test_switch_inside_tag_applies_to_attributes() {
        let out = compile_ok(json!([tag(1, "span", json!([]), json!([
            tag(2, "switch", json!([]), json!([
                tag(3, "case", json!([attr("test", logic(var("a")))]), json!([
                    single(4, "attribute", json!([attr("name", lit("role")), attr("value", lit("a"))]))
                ])),
                tag(5, "default", json!([]), json!([
                    single(6, "attribute", json!([attr("name", lit("role")), attr("value", lit("z"))]))
                ]))
            ]))
        ]))]));
        assert!(out.contains(concat!(
            "<?php $attrs1 = []; ?>\n",
            "<?php if ($__data[\"a\"]) { ?>\n",
            "<?php $attrs1[\"role\"] = \"a\"; ?>\n",
            "<?php } else { ?>\n",
            "<?php $attrs1[\"role\"] = \"z\"; ?>\n",
            "<?php } ?>\n",
        )));
    }

    #[test]
    fn test_nested_tags_get_their_own_fragments() {
        let out = compile_ok(json!([tag(1, "ul", json!([]), json!([
            tag(2, "li", json!([]), json!([
                single(3, "attribute", json!([attr("name", lit("class")), attr("value", lit("item"))]))
            ])),
            single(4, "attribute", json!([attr("name", lit("class")), attr("value", lit("list"))]))
        ]))]));
        assert!(out.contains("<?php $attrs2 = []; ?>\n<?php $attrs2[\"class\"] = \"item\"; ?>\n"));
        assert!(out.contains("<?php $attrs1 = []; ?>\n<?php $attrs1[\"class\"] = \"list\"; ?>\n"));
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // TEMPLATE AND STATE
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_template_hoists_children() {
        let out = compile_ok(json!([tag(1, "template", json!([attr("name", logic(var("header")))]), json!([
            tag(2, "b", json!([]), json!([text(3, "x")]))
        ]))]));
        assert_eq!(
            body(&out),
            concat!(
                "<?php $children1 = []; ?>\n",
                "<?php $attrs1 = []; ?>\n",
                "<?php $children2 = []; ?>\n",
                "<?php $children2[] = [\"text\" => \"x\"]; ?>\n",
                "<?php $children1[] = [\"tag\" => \"b\", \"attrs\" => $attrs1, \"children\" => $children2]; ?>\n",
                "<?php $__scope[\"header\"] = $children1; ?>\n",
            )
        );
    }

    #[test]
    fn test_use_state() {
        let out = compile_ok(json!([
            single(1, "use-state", json!([
                attr("name", logic(var("open"))),
                attr("value", logic(json!({ "type": "const", "value": "false" })))
            ])),
            single(2, "use-state", json!([attr("name", logic(var("count")))]))
        ]));
        assert!(out.contains(
            "<?php $__scope[\"open\"] = isset($__state[\"open\"]) ? $__state[\"open\"] : false; ?>\n"
        ));
        assert!(out.contains(
            "<?php $__scope[\"count\"] = isset($__state[\"count\"]) ? $__state[\"count\"] : null; ?>\n"
        ));
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // INCLUDE
    // ═══════════════════════════════════════════════════════════════════════════════

    fn include_options(file: &str) -> CompileOptions {
        CompileOptions {
            file_path: file.to_string(),
            registry_scope: RegistryScope::Session,
            ..CompileOptions::default()
        }
    }

    #[test]
    fn test_include_inlines_into_same_accumulator() {
        let loader = MemoryLoader::new().with(
            "pages/partials/header.json",
            json!([
                text(10, "header"),
                single(11, "attribute", json!([attr("name", lit("data-x")), attr("value", lit("1"))]))
            ]),
        );
        let page = template(json!([tag(1, "div", json!([]), json!([
            single(2, "include", json!([attr("from", lit("./partials/header.json"))]))
        ]))]));
        let out = compile_with_loader(&page, &include_options("pages/index.json"), &loader).unwrap();
        assert!(out.contains("<?php $children1[] = [\"text\" => \"header\"]; ?>\n"));
        assert!(out.contains("<?php $attrs1[\"data-x\"] = \"1\"; ?>\n"));
        assert!(!out.contains("\"tag\" => \"include\""));
    }

    #[test]
    fn test_included_identities_do_not_clash_with_ancestors() {
        let loader = MemoryLoader::new().with(
            "card.json",
            json!([tag(1, "p", json!([]), json!([text(2, "inner")]))]),
        );
        let page = template(json!([tag(1, "div", json!([]), json!([
            text(2, "before"),
            single(3, "include", json!([attr("from", lit("card.json"))]))
        ]))]));
        let out = compile_with_loader(&page, &include_options("page.json"), &loader).unwrap();
        assert_eq!(out.matches("$children1 = [];").count(), 1);
        assert!(out.contains(concat!(
            "<?php $children1 = []; ?>\n",
            "<?php $children1[] = [\"text\" => \"before\"]; ?>\n",
            "<?php $attrs2 = []; ?>\n",
            "<?php $children5 = []; ?>\n",
            "<?php $children5[] = [\"text\" => \"inner\"]; ?>\n",
            "<?php $children1[] = [\"tag\" => \"p\", \"attrs\" => $attrs2, \"children\" => $children5]; ?>\n",
            "<?php $children0[] = [\"tag\" => \"div\", \"attrs\" => $attrs1, \"children\" => $children1]; ?>\n",
        )));
    }

    #[test]
    fn test_include_cycle_fails() {
        let loader = MemoryLoader::new()
            .with("pages/b.json", json!([single(20, "include", json!([attr("from", lit("a.json"))]))]));
        let page = template(json!([single(1, "include", json!([attr("from", lit("b.json"))]))]));
        let err = compile_with_loader(&page, &include_options("pages/a.json"), &loader).unwrap_err();
        assert_eq!(err.kind, ErrorKind::IncludeCycle);
        assert_eq!(err.file, "pages/b.json");
    }

    #[test]
    fn test_include_errors() {
        let err = compile_err(json!([single(1, "include", json!([attr("from", logic(var("path")))]))]));
        assert_eq!(err.kind, ErrorKind::DynamicInclude);

        let err = compile_err(json!([single(1, "include", json!([attr("from", lit("missing.json"))]))]));
        assert_eq!(err.kind, ErrorKind::IncludeFailed);
        assert!(err.message.contains("missing.json"));
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // INPUT
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_compile_json_entry_point() {
        let options = include_options("page.json");
        let out = compile_json(r#"{ "nodes": [{ "type": "text", "id": 1, "text": "hi" }] }"#, &options).unwrap();
        assert!(out.contains("[\"text\" => \"hi\"]"));

        let err = compile_json("{ \"nodes\": [", &options).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidAst);
        assert_eq!(err.file, "page.json");
    }
}
