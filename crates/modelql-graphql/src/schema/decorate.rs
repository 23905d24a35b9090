//! List and non-null decoration of type names.

use async_graphql_parser::types::{BaseType, Type};

/// Decorates `name` with list levels and `!` markers.
///
/// `nullable` holds one entry per level, outermost list first and the named
/// type last, so its length is `depth + 1`. An empty vector decorates the
/// bare non-null name.
///
/// ```ignore
/// assert_eq!(decorate("T", &[false, true]), "[T]!");
/// ```
#[must_use]
pub fn decorate(name: &str, nullable: &[bool]) -> String {
    let Some((innermost, lists)) = nullable.split_last() else {
        return format!("{name}!");
    };
    let mut decorated = name.to_string();
    if !innermost {
        decorated.push('!');
    }
    for level_nullable in lists.iter().rev() {
        decorated = format!("[{decorated}]");
        if !level_nullable {
            decorated.push('!');
        }
    }
    decorated
}

/// A decorated type string taken apart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecoratedType {
    pub name: String,
    pub depth: usize,
    pub nullable: Vec<bool>,
}

/// Parses a decorated type string such as `[[T]!]`.
///
/// Returns `None` if the string is not a GraphQL type reference.
#[must_use]
pub fn parse_decorated(decorated: &str) -> Option<DecoratedType> {
    let mut ty = Type::new(decorated)?;
    let mut nullable = Vec::new();
    loop {
        nullable.push(ty.nullable);
        match ty.base {
            BaseType::Named(name) => {
                if !is_name(&name) {
                    return None;
                }
                return Some(DecoratedType {
                    name: name.to_string(),
                    depth: nullable.len() - 1,
                    nullable,
                });
            }
            BaseType::List(inner) => ty = *inner,
        }
    }
}

fn is_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_decoration() {
        assert_eq!(decorate("String", &[false]), "String!");
        assert_eq!(decorate("String", &[true]), "String");
        assert_eq!(decorate("ID", &[]), "ID!");
    }

    #[test]
    fn test_depth_two_combinations() {
        let cases = [
            ([false, false, true], "[[T]!]!"),
            ([false, true, true], "[[T]]!"),
            ([true, false, true], "[[T]!]"),
            ([true, true, true], "[[T]]"),
            ([false, false, false], "[[T!]!]!"),
        ];
        for (vector, expected) in cases {
            assert_eq!(decorate("T", &vector), expected);
            let parsed = parse_decorated(expected).unwrap();
            assert_eq!(parsed.name, "T");
            assert_eq!(parsed.depth, 2);
            assert_eq!(parsed.nullable, vector.to_vec());
        }
    }

    #[test]
    fn test_roundtrip_all_vectors_up_to_depth_three() {
        for depth in 0..=3usize {
            for bits in 0..(1u32 << (depth + 1)) {
                let vector: Vec<bool> = (0..=depth).map(|i| bits & (1 << i) != 0).collect();
                let decorated = decorate("Node", &vector);
                let parsed = parse_decorated(&decorated).unwrap();
                assert_eq!(parsed.depth, depth, "{decorated}");
                assert_eq!(parsed.nullable, vector, "{decorated}");
            }
        }
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_decorated("[T").is_none());
        assert!(parse_decorated("").is_none());
        assert!(parse_decorated("[9lives]").is_none());
    }
}
