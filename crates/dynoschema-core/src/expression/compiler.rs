//! Renders predicates into expression text with placeholder maps.

use std::collections::BTreeMap;

use dynoschema_model::AttributeValue;
use tracing::trace;

use super::placeholder::PlaceholderAllocator;
use super::predicate::{Operator, Predicate};
use crate::path::{AttributePath, PathElement};

/// A rendered expression and the placeholders it references.
///
/// Every placeholder in `text` has exactly one entry in one of the maps, and
/// the maps hold nothing else.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompiledExpression {
    /// Expression text, predicates joined with ` AND `.
    pub text: String,
    /// `#nN` placeholder to attribute name.
    pub attribute_names: BTreeMap<String, String>,
    /// `:vN` placeholder to literal value.
    pub attribute_values: BTreeMap<String, AttributeValue>,
}

impl CompiledExpression {
    /// Returns `true` if no predicate was rendered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// The text, or `None` when empty.
    #[must_use]
    pub fn text(&self) -> Option<String> {
        (!self.is_empty()).then(|| self.text.clone())
    }

    /// Move this expression's placeholder maps into request-level maps.
    pub fn drain_into(
        self,
        names: &mut BTreeMap<String, String>,
        values: &mut BTreeMap<String, AttributeValue>,
    ) -> Option<String> {
        names.extend(self.attribute_names);
        values.extend(self.attribute_values);
        (!self.text.is_empty()).then_some(self.text)
    }
}

/// Accumulates predicates and renders them as one conjunction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExpressionCompiler {
    predicates: Vec<Predicate>,
}

impl ExpressionCompiler {
    /// An empty compiler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a predicate.
    pub fn add_predicate(&mut self, predicate: Predicate) {
        self.predicates.push(predicate);
    }

    /// Predicates in insertion order.
    #[must_use]
    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    /// Number of predicates added.
    #[must_use]
    pub fn len(&self) -> usize {
        self.predicates.len()
    }

    /// Returns `true` if no predicate has been added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    /// Render with a fresh allocator that placeholders every name.
    #[must_use]
    pub fn render(&self) -> CompiledExpression {
        self.render_with(&mut PlaceholderAllocator::default())
    }

    /// Render, continuing the numbering of `alloc`.
    pub fn render_with(&self, alloc: &mut PlaceholderAllocator) -> CompiledExpression {
        let mut out = CompiledExpression::default();
        let mut fragments = Vec::with_capacity(self.predicates.len());

        for predicate in &self.predicates {
            let path = render_path(predicate.path(), alloc, &mut out.attribute_names);
            let operands: Vec<String> = predicate
                .operands()
                .iter()
                .map(|value| {
                    let placeholder = alloc.next_value();
                    out.attribute_values
                        .insert(placeholder.clone(), value.clone());
                    placeholder
                })
                .collect();
            fragments.push(render_fragment(predicate.operator(), &path, &operands));
        }

        out.text = fragments.join(" AND ");
        trace!(
            predicates = self.predicates.len(),
            text_len = out.text.len(),
            names = out.attribute_names.len(),
            values = out.attribute_values.len(),
            "rendered expression"
        );
        out
    }
}

fn render_path(
    path: &AttributePath,
    alloc: &mut PlaceholderAllocator,
    names: &mut BTreeMap<String, String>,
) -> String {
    let mut text = String::new();
    for (i, element) in path.elements.iter().enumerate() {
        match element {
            PathElement::Attribute(name) => {
                if i > 0 {
                    text.push('.');
                }
                if alloc.needs_placeholder(name) {
                    let placeholder = alloc.next_name();
                    text.push_str(&placeholder);
                    names.insert(placeholder, name.clone());
                } else {
                    text.push_str(name);
                }
            }
            PathElement::Index(idx) => {
                text.push('[');
                text.push_str(&idx.to_string());
                text.push(']');
            }
        }
    }
    text
}

fn render_fragment(operator: Operator, path: &str, operands: &[String]) -> String {
    match operator {
        Operator::Eq | Operator::Ne | Operator::Lt | Operator::Le | Operator::Gt | Operator::Ge => {
            let symbol = operator.symbol().unwrap_or_default();
            format!("{path} {symbol} {}", operands[0])
        }
        Operator::Between => format!("{path} BETWEEN {} AND {}", operands[0], operands[1]),
        Operator::BeginsWith => format!("begins_with({path}, {})", operands[0]),
        Operator::Contains => format!("contains({path}, {})", operands[0]),
        Operator::In => format!("{path} IN ({})", operands.join(", ")),
        Operator::Exists => format!("attribute_exists({path})"),
        Operator::NotExists => format!("attribute_not_exists({path})"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NamePolicy;

    fn predicate(path: &str, operator: Operator, operands: Vec<AttributeValue>) -> Predicate {
        Predicate::new(AttributePath::parse(path).unwrap(), operator, operands).unwrap()
    }

    #[test]
    fn test_should_render_eq_and_between() {
        let mut compiler = ExpressionCompiler::new();
        compiler.add_predicate(predicate("is_active", Operator::Eq, vec![true.into()]));
        compiler.add_predicate(predicate("age", Operator::Between, vec![18.into(), 65.into()]));

        let expr = compiler.render();
        assert_eq!(expr.text, "#n0 = :v0 AND #n1 BETWEEN :v1 AND :v2");
        assert_eq!(
            expr.attribute_names,
            BTreeMap::from([
                ("#n0".to_owned(), "is_active".to_owned()),
                ("#n1".to_owned(), "age".to_owned()),
            ])
        );
        assert_eq!(
            expr.attribute_values,
            BTreeMap::from([
                (":v0".to_owned(), AttributeValue::Bool(true)),
                (":v1".to_owned(), AttributeValue::N("18".to_owned())),
                (":v2".to_owned(), AttributeValue::N("65".to_owned())),
            ])
        );
    }

    #[test]
    fn test_should_render_every_operator() {
        let cases = [
            (Operator::Ne, vec![AttributeValue::from("x")], "#n0 <> :v0"),
            (Operator::Lt, vec![1.into()], "#n0 < :v0"),
            (Operator::Le, vec![1.into()], "#n0 <= :v0"),
            (Operator::Gt, vec![1.into()], "#n0 > :v0"),
            (Operator::Ge, vec![1.into()], "#n0 >= :v0"),
            (Operator::BeginsWith, vec!["ab".into()], "begins_with(#n0, :v0)"),
            (Operator::Contains, vec!["ab".into()], "contains(#n0, :v0)"),
            (Operator::In, vec![1.into()], "#n0 IN (:v0)"),
            (Operator::In, vec![1.into(), 2.into(), 3.into()], "#n0 IN (:v0, :v1, :v2)"),
            (Operator::Exists, vec![], "attribute_exists(#n0)"),
            (Operator::NotExists, vec![], "attribute_not_exists(#n0)"),
        ];
        for (operator, operands, expected) in cases {
            let arity = operands.len();
            let mut compiler = ExpressionCompiler::new();
            compiler.add_predicate(predicate("email", operator, operands));
            let expr = compiler.render();
            assert_eq!(expr.text, expected);
            assert_eq!(expr.attribute_names.len(), 1);
            assert_eq!(expr.attribute_values.len(), arity);
        }
    }

    #[test]
    fn test_should_render_nothing_for_no_predicates() {
        let expr = ExpressionCompiler::new().render();
        assert!(expr.is_empty());
        assert!(expr.text().is_none());
        assert!(expr.attribute_names.is_empty());
        assert!(expr.attribute_values.is_empty());
    }

    #[test]
    fn test_should_placeholder_each_nested_segment() {
        let mut compiler = ExpressionCompiler::new();
        compiler.add_predicate(predicate("address.city", Operator::Eq, vec!["Oslo".into()]));
        compiler.add_predicate(predicate("orders[2].total", Operator::Gt, vec![100.into()]));

        let expr = compiler.render();
        assert_eq!(expr.text, "#n0.#n1 = :v0 AND #n2[2].#n3 > :v1");
        assert_eq!(expr.attribute_names["#n1"], "city");
        assert_eq!(expr.attribute_names["#n3"], "total");
    }

    #[test]
    fn test_should_render_consecutive_list_indices() {
        let mut compiler = ExpressionCompiler::new();
        compiler.add_predicate(predicate("grid[0][11].cell", Operator::Exists, vec![]));

        let expr = compiler.render();
        assert_eq!(expr.text, "attribute_exists(#n0[0][11].#n1)");
        assert_eq!(expr.attribute_names.len(), 2);
        assert!(expr.attribute_values.is_empty());
    }

    #[test]
    fn test_should_not_deduplicate_repeated_names() {
        let mut compiler = ExpressionCompiler::new();
        compiler.add_predicate(predicate("age", Operator::Ge, vec![18.into()]));
        compiler.add_predicate(predicate("age", Operator::Le, vec![65.into()]));

        let expr = compiler.render();
        assert_eq!(expr.text, "#n0 >= :v0 AND #n1 <= :v1");
        assert_eq!(expr.attribute_names.len(), 2);
    }

    #[test]
    fn test_should_inline_plain_names_under_reserved_only() {
        let mut compiler = ExpressionCompiler::new();
        compiler.add_predicate(predicate("age", Operator::Gt, vec![21.into()]));
        compiler.add_predicate(predicate("status", Operator::Eq, vec!["active".into()]));
        compiler.add_predicate(predicate("first-name", Operator::Exists, vec![]));

        let mut alloc = PlaceholderAllocator::new(NamePolicy::ReservedOnly);
        let expr = compiler.render_with(&mut alloc);
        assert_eq!(
            expr.text,
            "age > :v0 AND #n0 = :v1 AND attribute_exists(#n1)"
        );
        assert_eq!(expr.attribute_names["#n0"], "status");
        assert_eq!(expr.attribute_names["#n1"], "first-name");
        assert!(!expr.text.contains("status"));
    }

    #[test]
    fn test_should_continue_numbering_with_shared_allocator() {
        let mut key = ExpressionCompiler::new();
        key.add_predicate(predicate("user_id", Operator::Eq, vec!["u1".into()]));
        let mut filter = ExpressionCompiler::new();
        filter.add_predicate(predicate("age", Operator::Gt, vec![30.into()]));

        let mut alloc = PlaceholderAllocator::default();
        let key_expr = key.render_with(&mut alloc);
        let filter_expr = filter.render_with(&mut alloc);
        assert_eq!(key_expr.text, "#n0 = :v0");
        assert_eq!(filter_expr.text, "#n1 > :v1");

        let mut names = BTreeMap::new();
        let mut values = BTreeMap::new();
        assert_eq!(key_expr.drain_into(&mut names, &mut values).as_deref(), Some("#n0 = :v0"));
        assert_eq!(filter_expr.drain_into(&mut names, &mut values).as_deref(), Some("#n1 > :v1"));
        assert_eq!(names.len(), 2);
        assert_eq!(values.len(), 2);
    }

    #[test]
    fn test_should_render_deterministically() {
        let mut compiler = ExpressionCompiler::new();
        for i in 0..20 {
            compiler.add_predicate(predicate("age", Operator::In, vec![i.into(), (i + 1).into()]));
        }
        let first = compiler.render();
        let second = compiler.render();
        assert_eq!(first, second);
        assert_eq!(first.text.matches(" AND ").count(), 19);
        assert_eq!(first.attribute_values.len(), 40);
        assert_eq!(
            serde_json::to_string(&first.attribute_values).unwrap(),
            serde_json::to_string(&second.attribute_values).unwrap()
        );
    }
}
