use super::predicate::Predicate;

/// Canonical cache key for a query: table name plus every
/// `(column, operator, value, connective)` tuple, in order.
///
/// Each field is length-prefixed (`len:text;`) so no choice of column names
/// or values can make two different queries produce the same string.
pub fn fingerprint(table: &str, predicates: &[Predicate]) -> String {
    let mut out = String::new();
    push_field(&mut out, table);
    for p in predicates {
        push_field(&mut out, &p.column);
        push_field(&mut out, p.op.as_str());
        push_field(&mut out, &p.value);
        push_field(&mut out, p.connective.map_or("", |c| c.as_str()));
    }
    out
}

fn push_field(out: &mut String, field: &str) {
    out.push_str(&format!("{}:{};", field.len(), field));
}
