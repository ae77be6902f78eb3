
use super::*;
use crate::{
    error::QueryError,
    expr::{
        HostObject, HostValue, StringComparison, field, is_null_or_empty, lit, null, object,
        param, static_member, string_equals,
    },
    native::{CompareOp, Opcode, Operand, StringOp},
    test_support::{
        ADDRESS, PERSON, cmp, col, fixture_schema, string_op, translate_filter,
        translate_filter_with,
    },
    value::{Literal, RecordRef, RowKey, Timestamp},
};

#[derive(Debug)]
struct Closure {
    min_age: i32,
    inner: Option<std::rc::Rc<Closure>>,
}

impl HostObject for Closure {
    fn type_name(&self) -> &str {
        "Closure"
    }

    fn member(&self, name: &str) -> Option<HostValue> {
        match name {
            "min_age" => Some(HostValue::from(self.min_age)),
            "inner" => self
                .inner
                .clone()
                .map(|inner| HostValue::Object(inner as std::rc::Rc<dyn HostObject>)),
            _ => None,
        }
    }
}

fn sorted(requests: &[SortRequest]) -> Result<Option<SortPlan>, QueryError> {
    let schema = fixture_schema();
    let mut builder = SortClauseBuilder::new(&schema, PERSON);
    for request in requests {
        builder.add_clause(request)?;
    }
    Ok(builder.finish())
}

// ----------------------------------------------------------------------
// Constant evaluation
// ----------------------------------------------------------------------

#[test]
fn constant_evaluator_reads_nested_captures() {
    let statics = crate::expr::StaticRegistry::new();
    let evaluator = ConstantEvaluator::new(&statics);
    let env = Closure {
        min_age: 1,
        inner: Some(std::rc::Rc::new(Closure {
            min_age: 42,
            inner: None,
        })),
    };

    let value = evaluator
        .evaluate_literal(&object(env).member("inner").member("min_age"))
        .expect("nested capture should evaluate");

    assert_eq!(value, Literal::I32(42));
}

#[test]
fn constant_evaluator_resolves_registered_statics() {
    let mut statics = crate::expr::StaticRegistry::new();
    statics.register("Limits", "Adult", 18);
    let evaluator = ConstantEvaluator::new(&statics);

    assert_eq!(
        evaluator
            .evaluate_literal(&static_member("Limits", "Adult"))
            .expect("static should resolve"),
        Literal::I32(18)
    );
    assert!(matches!(
        evaluator.evaluate(&static_member("Limits", "Senior")),
        Err(QueryError::UnsupportedExpression { .. })
    ));
}

#[test]
fn constant_evaluator_rejects_non_constants() {
    let statics = crate::expr::StaticRegistry::new();
    let evaluator = ConstantEvaluator::new(&statics);

    for expr in [
        param(),
        field("Age"),
        lit("a").call("ToUpper", Vec::new()),
        lit(1).eq(2),
        lit(5).member("Length"),
    ] {
        assert!(
            matches!(
                evaluator.evaluate(&expr),
                Err(QueryError::UnsupportedExpression { .. })
            ),
            "{expr} should not evaluate"
        );
    }
}

// ----------------------------------------------------------------------
// Boolean structure
// ----------------------------------------------------------------------

#[test]
fn and_is_implicit() {
    let ops = translate_filter(&field("Age").eq(30).and(field("Name").eq("Bob"))).unwrap();

    assert_eq!(
        ops,
        vec![
            cmp(2, CompareOp::Eq, Operand::Int(30)),
            cmp(
                1,
                CompareOp::Eq,
                Operand::String {
                    value: "Bob".into(),
                    case_sensitive: true
                }
            ),
        ]
    );
}

#[test]
fn or_is_grouped() {
    let ops = translate_filter(&field("Age").lt(18).or(field("Age").gt(65))).unwrap();

    assert_eq!(
        ops,
        vec![
            Opcode::GroupBegin,
            cmp(2, CompareOp::Lt, Operand::Int(18)),
            Opcode::Or,
            cmp(2, CompareOp::Gt, Operand::Int(65)),
            Opcode::GroupEnd,
        ]
    );
}

#[test]
fn not_prefixes_the_next_predicate() {
    let ops = translate_filter(&!field("Age").eq(3)).unwrap();

    assert_eq!(
        ops,
        vec![Opcode::Not, cmp(2, CompareOp::Eq, Operand::Int(3))]
    );
}

#[test]
fn not_over_conjunction_is_grouped() {
    let ops = translate_filter(&!(field("Age").eq(3) & field("Id").eq(1))).unwrap();

    assert_eq!(
        ops,
        vec![
            Opcode::Not,
            Opcode::GroupBegin,
            cmp(2, CompareOp::Eq, Operand::Int(3)),
            cmp(0, CompareOp::Eq, Operand::Int(1)),
            Opcode::GroupEnd,
        ]
    );
}

#[test]
fn bare_bool_property_is_an_equality() {
    let ops = translate_filter(&!field("Active")).unwrap();

    assert_eq!(
        ops,
        vec![Opcode::Not, cmp(3, CompareOp::Eq, Operand::Bool(true))]
    );
}

#[test]
fn bare_non_bool_property_is_rejected() {
    assert!(matches!(
        translate_filter(&field("Age")),
        Err(QueryError::UnsupportedExpression { .. })
    ));
}

// ----------------------------------------------------------------------
// Comparisons
// ----------------------------------------------------------------------

#[test]
fn opcode_follows_literal_runtime_type() {
    let born = Timestamp::from_millis(1_000);
    let cases = [
        (field("Age").eq(7_i64), cmp(2, CompareOp::Eq, Operand::Long(7))),
        (field("Age").gte('A'), cmp(2, CompareOp::Gte, Operand::Long(65))),
        (field("Score").lte(1.5_f64), cmp(4, CompareOp::Lte, Operand::Double(1.5))),
        (field("Rating").gt(2.5_f32), cmp(5, CompareOp::Gt, Operand::Float(2.5))),
        (field("Born").lt(born), cmp(6, CompareOp::Lt, Operand::Timestamp(born))),
        (field("Active").ne(false), cmp(3, CompareOp::Ne, Operand::Bool(false))),
        (field("Active").gt(false), cmp(3, CompareOp::Gt, Operand::Long(0))),
        (
            field("Photo").eq(vec![1_u8, 2]),
            cmp(7, CompareOp::Eq, Operand::Binary(vec![1, 2])),
        ),
    ];

    for (expr, expected) in cases {
        assert_eq!(translate_filter(&expr).unwrap(), vec![expected], "{expr}");
    }
}

#[test]
fn null_and_empty_binary_are_distinct() {
    let null_ops = translate_filter(&field("Photo").eq(null())).unwrap();
    let empty_ops = translate_filter(&field("Photo").eq(Vec::<u8>::new())).unwrap();

    assert_eq!(null_ops, vec![cmp(7, CompareOp::Eq, Operand::Null)]);
    assert_eq!(empty_ops, vec![cmp(7, CompareOp::Eq, Operand::EmptyBinary)]);
}

#[test]
fn ordering_against_null_is_unsupported() {
    assert!(matches!(
        translate_filter(&field("Name").lt(null())),
        Err(QueryError::UnsupportedExpression { .. })
    ));
}

#[test]
fn null_against_required_property_is_a_type_mismatch() {
    let err = translate_filter(&field("Age").eq(null())).unwrap_err();

    assert!(matches!(
        err,
        QueryError::TypeMismatch { ref property, found: "null", .. } if property == "Age"
    ));
}

#[test]
fn cross_kind_literals_are_type_mismatches() {
    for expr in [
        field("Age").eq("7"),
        field("Score").eq(1.0_f32),
        field("Rating").eq(1.0_f64),
        field("Name").eq(3),
        field("Active").eq(1),
    ] {
        assert!(
            matches!(translate_filter(&expr), Err(QueryError::TypeMismatch { .. })),
            "{expr} should mismatch"
        );
    }
}

#[test]
fn char_widening_can_be_disabled() {
    let config = crate::config::QueryConfig::default().with_char_int_compat(false);
    let statics = crate::expr::StaticRegistry::new();

    assert!(matches!(
        translate_filter_with(&field("Age").eq('x'), &statics, &config),
        Err(QueryError::TypeMismatch { found: "char", .. })
    ));
}

#[test]
fn mirrored_comparison_flips_the_operator() {
    let ops = translate_filter(&lit(5).lt(field("Age"))).unwrap();

    assert_eq!(ops, vec![cmp(2, CompareOp::Gt, Operand::Int(5))]);
}

#[test]
fn conversions_are_transparent() {
    let ops = translate_filter(&field("Age").convert().eq(lit(9_i64).convert())).unwrap();

    assert_eq!(ops, vec![cmp(2, CompareOp::Eq, Operand::Long(9))]);
}

#[test]
fn captured_values_are_evaluated() {
    let env = Closure {
        min_age: 21,
        inner: None,
    };
    let ops = translate_filter(&field("Age").gte(object(env).member("min_age"))).unwrap();

    assert_eq!(ops, vec![cmp(2, CompareOp::Gte, Operand::Int(21))]);
}

#[test]
fn object_identity_comparisons() {
    let home = RecordRef::new(ADDRESS, RowKey(4));

    let eq = translate_filter(&field("Address").eq(home.clone())).unwrap();
    let ne = translate_filter(&field("Address").ne(home)).unwrap();

    assert_eq!(eq, vec![cmp(8, CompareOp::Eq, Operand::Object(RowKey(4)))]);
    assert_eq!(
        ne,
        vec![Opcode::Not, cmp(8, CompareOp::Eq, Operand::Object(RowKey(4)))]
    );
}

#[test]
fn object_of_wrong_type_is_a_mismatch() {
    let other = RecordRef::new(PERSON, RowKey(1));

    assert!(matches!(
        translate_filter(&field("Address").eq(other)),
        Err(QueryError::TypeMismatch { .. })
    ));
}

#[test]
fn invalid_comparison_targets() {
    for expr in [
        field("Address").member("City").eq("Oslo"),
        field("Tags").eq("x"),
        field("Missing").eq(1),
        field("Name").call("Trim", Vec::new()).eq("x"),
    ] {
        assert!(
            matches!(
                translate_filter(&expr),
                Err(QueryError::InvalidComparisonTarget { .. })
            ),
            "{expr} should be an invalid target"
        );
    }
}

#[test]
fn property_to_property_comparison_is_unsupported() {
    assert!(matches!(
        translate_filter(&field("Age").eq(field("Id"))),
        Err(QueryError::UnsupportedExpression { .. })
    ));
}

// ----------------------------------------------------------------------
// String predicates
// ----------------------------------------------------------------------

#[test]
fn string_patterns_default_to_case_sensitive() {
    let ops = translate_filter(
        &field("Name")
            .contains("ob")
            .and(field("Name").starts_with("B"))
            .and(field("Name").ends_with("b"))
            .and(field("Name").like("B*b")),
    )
    .unwrap();

    assert_eq!(
        ops,
        vec![
            string_op(1, StringOp::Contains, "ob", true),
            string_op(1, StringOp::StartsWith, "B", true),
            string_op(1, StringOp::EndsWith, "b", true),
            string_op(1, StringOp::Like, "B*b", true),
        ]
    );
}

#[test]
fn case_flags_map_to_sensitivity() {
    let insensitive =
        translate_filter(&field("Name").contains_using("bob", StringComparison::OrdinalIgnoreCase))
            .unwrap();
    let sensitive =
        translate_filter(&field("Name").ends_with_using("bob", StringComparison::Ordinal)).unwrap();
    let like = translate_filter(&field("Name").like_using("b?b", false)).unwrap();

    assert_eq!(insensitive, vec![string_op(1, StringOp::Contains, "bob", false)]);
    assert_eq!(sensitive, vec![string_op(1, StringOp::EndsWith, "bob", true)]);
    assert_eq!(like, vec![string_op(1, StringOp::Like, "b?b", false)]);
}

#[test]
fn culture_modes_are_unsupported() {
    for mode in [
        StringComparison::CurrentCulture,
        StringComparison::CurrentCultureIgnoreCase,
        StringComparison::InvariantCulture,
        StringComparison::InvariantCultureIgnoreCase,
    ] {
        assert!(matches!(
            translate_filter(&field("Name").starts_with_using("a", mode)),
            Err(QueryError::UnsupportedExpression { .. })
        ));
    }
}

#[test]
fn string_pattern_accepts_null_comparand() {
    let contains = translate_filter(&field("Name").contains(null())).unwrap();
    let like = translate_filter(&field("Name").like_using(null(), false)).unwrap();

    assert_eq!(
        contains,
        vec![Opcode::String {
            column: col(1),
            op: StringOp::Contains,
            pattern: None,
            case_sensitive: true,
        }]
    );
    assert_eq!(
        like,
        vec![Opcode::String {
            column: col(1),
            op: StringOp::Like,
            pattern: None,
            case_sensitive: false,
        }]
    );
}

#[test]
fn string_pattern_argument_rules() {
    assert!(matches!(
        translate_filter(&field("Name").contains(5)),
        Err(QueryError::TypeMismatch { found: "i32", .. })
    ));
    assert!(matches!(
        translate_filter(&field("Age").contains("1")),
        Err(QueryError::TypeMismatch { found: "int", .. })
    ));
    assert!(matches!(
        translate_filter(&lit("abc").contains(field("Name"))),
        Err(QueryError::UnsupportedExpression { .. })
    ));
}

#[test]
fn equals_instance_and_static_forms() {
    let instance =
        translate_filter(&field("Name").equals_using("bob", StringComparison::OrdinalIgnoreCase))
            .unwrap();
    let reversed = translate_filter(&string_equals(
        "bob",
        field("Name"),
        Some(StringComparison::Ordinal),
    ))
    .unwrap();
    let null_eq = translate_filter(&field("Name").equals(null())).unwrap();

    let bob = |case_sensitive| Operand::String {
        value: "bob".into(),
        case_sensitive,
    };
    assert_eq!(instance, vec![cmp(1, CompareOp::Eq, bob(false))]);
    assert_eq!(reversed, vec![cmp(1, CompareOp::Eq, bob(true))]);
    assert_eq!(null_eq, vec![cmp(1, CompareOp::Eq, Operand::Null)]);
}

#[test]
fn is_null_or_empty_is_a_grouped_compound() {
    let ops = translate_filter(&is_null_or_empty(field("Name"))).unwrap();

    assert_eq!(
        ops,
        vec![
            Opcode::GroupBegin,
            cmp(1, CompareOp::Eq, Operand::Null),
            Opcode::Or,
            cmp(
                1,
                CompareOp::Eq,
                Operand::String {
                    value: String::new(),
                    case_sensitive: true
                }
            ),
            Opcode::GroupEnd,
        ]
    );
}

#[test]
fn full_text_search_emits_terms() {
    let ops = translate_filter(&field("Bio").full_text_search("rust -java")).unwrap();

    assert_eq!(
        ops,
        vec![Opcode::FullText {
            column: col(11),
            terms: "rust -java".into()
        }]
    );
    assert!(matches!(
        translate_filter(&field("Bio").full_text_search(null())),
        Err(QueryError::UnsupportedExpression { .. })
    ));
}

#[test]
fn unknown_methods_are_unsupported() {
    let err = translate_filter(&field("Name").call("Matches", vec![lit("x")])).unwrap_err();

    assert!(matches!(err, QueryError::UnsupportedExpression { ref construct } if construct.contains("Matches")));
}

// ----------------------------------------------------------------------
// Sort clauses
// ----------------------------------------------------------------------

#[test]
fn sort_chain_resolves_across_links() {
    let plan = sorted(&[
        SortRequest::new("Address.Country.Name", SortOperator::OrderByDescending),
        SortRequest::new("Age", SortOperator::ThenBy),
    ])
    .unwrap()
    .expect("plan should exist");

    assert_eq!(plan.clauses.len(), 2);
    assert_eq!(plan.clauses[0].columns, vec![col(8), col(1), col(0)]);
    assert!(!plan.clauses[0].ascending);
    assert_eq!(plan.clauses[1].columns, vec![col(2)]);
    assert!(plan.clauses[1].ascending);
}

#[test]
fn no_ordering_yields_no_plan() {
    assert!(sorted(&[]).unwrap().is_none());
}

#[test]
fn second_primary_ordering_is_ambiguous() {
    let err = sorted(&[
        SortRequest::new("Age", SortOperator::OrderBy),
        SortRequest::new("Name", SortOperator::OrderByDescending),
    ])
    .unwrap_err();

    assert!(matches!(
        err,
        QueryError::AmbiguousSortSpecification {
            operator: "order_by_descending",
            use_instead: "then_by_descending",
        }
    ));
}

#[test]
fn secondary_without_primary_is_unsupported() {
    assert!(matches!(
        sorted(&[SortRequest::new("Age", SortOperator::ThenBy)]),
        Err(QueryError::UnsupportedExpression { .. })
    ));
}

#[test]
fn unsortable_chains_are_unsupported() {
    for chain in ["Photo", "Address", "Tags", "Friends.Age", "Age.Name", "Nope", ""] {
        assert!(
            matches!(
                sorted(&[SortRequest::new(chain, SortOperator::OrderBy)]),
                Err(QueryError::UnsupportedExpression { .. })
            ),
            "'{chain}' should not be sortable"
        );
    }
}

// ----------------------------------------------------------------------
// Whole graph
// ----------------------------------------------------------------------

#[test]
fn translate_graph_ands_filters_and_is_deterministic() {
    let schema = fixture_schema();
    let statics = crate::expr::StaticRegistry::new();
    let config = crate::config::QueryConfig::default();
    let ctx = TranslateContext {
        schema: &schema,
        statics: &statics,
        config: &config,
        table: PERSON,
    };
    let filters = [field("Age").gt(3), field("Active")];
    let ordering = [SortRequest::new("Name", SortOperator::OrderBy)];

    let first = translate_graph(ctx, &filters, &ordering).unwrap();
    let second = translate_graph(ctx, &filters, &ordering).unwrap();

    assert_eq!(first, second);
    assert_eq!(first.opcodes.len(), 2);
    assert!(first.is_sorted());
    assert!(first.to_string().contains("sort Name [col#1] asc"));
}

#[test]
fn translate_graph_rejects_unknown_tables() {
    let schema = fixture_schema();
    let statics = crate::expr::StaticRegistry::new();
    let config = crate::config::QueryConfig::default();
    let ctx = TranslateContext {
        schema: &schema,
        statics: &statics,
        config: &config,
        table: "Ghost",
    };

    assert!(matches!(
        translate_graph(ctx, &[], &[]),
        Err(QueryError::UnsupportedExpression { .. })
    ));
}
