// Licensed under the Apache-2.0 license

//! Struct model extraction from module headers.
//!
//! Only a narrow subset of C++ is recognized inside a struct body:
//!
//! ```text
//! <qualified-type> <identifier> ([<dim-expr>])* [= <initializer>];
//! ```
//!
//! Member functions (anything mentioning parentheses), nested
//! `struct`/`enum` definitions and `using` aliases are skipped. Any other
//! statement is rejected with [`GenError::BadDeclaration`].

use log::{debug, trace};

use crate::error::{GenError, Result};
use crate::lexer::{strip_comments, Lexer, Token, TokenKind};
use crate::width::WidthTable;

const SKIPPED_KEYWORDS: &[&str] = &["struct", "enum", "using"];
const ACCESS_SPECIFIERS: &[&str] = &["public", "private", "protected"];

/// One data member of a struct.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldDecl {
    pub type_name: String,
    pub name: String,
    /// Array dimensions as source expressions, outermost first.
    pub dims: Vec<String>,
}

/// A struct and its data members in declaration order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StructModel {
    pub name: String,
    pub fields: Vec<FieldDecl>,
}

impl StructModel {
    /// Total packed width for resolved dimension values.
    pub fn bit_count(
        &self,
        widths: &WidthTable,
        dims: &crate::dims::DimensionTable,
    ) -> Result<usize> {
        let mut bits = 0usize;
        for field in &self.fields {
            let width = widths.width_of(&field.type_name)?;
            let count = dims.element_count(&field.dims)?;
            bits = width
                .checked_mul(count)
                .and_then(|b| bits.checked_add(b))
                .ok_or_else(|| {
                    GenError::Evaluation(format!("struct {} is too wide to lay out", self.name))
                })?;
        }
        Ok(bits)
    }
}

/// A comment-stripped, tokenized header ready for struct lookups.
pub struct Header {
    text: String,
    tokens: Vec<Token>,
}

impl Header {
    pub fn parse(source: &str) -> Self {
        let text = strip_comments(source);
        let tokens = Lexer::new(&text).tokenize();
        Self { text, tokens }
    }

    /// Extract the data members of `struct <struct_name> { ... }`.
    ///
    /// The first definition in the header wins.
    pub fn extract(&self, struct_name: &str) -> Result<StructModel> {
        let open = self
            .find_struct_open(struct_name)
            .ok_or_else(|| GenError::StructNotFound(struct_name.to_string()))?;
        let close = self
            .matching_brace(open)
            .ok_or_else(|| GenError::UnterminatedStruct(struct_name.to_string()))?;

        let mut fields = Vec::new();
        for stmt in self.statements(&self.tokens[open + 1..close]) {
            if let Some(field) = self.parse_statement(struct_name, stmt)? {
                trace!("{struct_name}: {field:?}");
                fields.push(field);
            }
        }
        debug!("extracted struct {struct_name} with {} fields", fields.len());
        Ok(StructModel {
            name: struct_name.to_string(),
            fields,
        })
    }

    /// Index of the `{` token following `struct <name>`.
    fn find_struct_open(&self, struct_name: &str) -> Option<usize> {
        self.tokens
            .windows(3)
            .position(|w| {
                w[0].is_ident(&self.text, "struct")
                    && w[1].is_ident(&self.text, struct_name)
                    && w[2].is_punct('{')
            })
            .map(|i| i + 2)
    }

    /// Index of the `}` that closes the brace at `open`.
    fn matching_brace(&self, open: usize) -> Option<usize> {
        let mut depth = 0usize;
        for (i, tok) in self.tokens.iter().enumerate().skip(open) {
            if tok.is_punct('{') {
                depth += 1;
            } else if tok.is_punct('}') {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
        }
        None
    }

    /// Split a struct body into statements.
    ///
    /// `;` ends a statement at brace depth 0. A closing brace that returns to
    /// depth 0 also ends a statement that contains parentheses, so inline
    /// member function bodies do not absorb the declaration after them.
    /// Braces followed by `,` or `{` belong to a constructor initializer
    /// list and keep the statement open.
    fn statements<'t>(&self, body: &'t [Token]) -> Vec<&'t [Token]> {
        let mut out = Vec::new();
        let mut start = 0;
        let mut depth = 0usize;
        let mut saw_paren = false;
        for (i, tok) in body.iter().enumerate() {
            match tok.kind {
                TokenKind::Punct('{') => depth += 1,
                TokenKind::Punct('}') => {
                    depth = depth.saturating_sub(1);
                    let continues = matches!(
                        body.get(i + 1),
                        Some(next) if next.is_punct(',') || next.is_punct('{')
                    );
                    if depth == 0 && saw_paren && !continues {
                        out.push(&body[start..=i]);
                        start = i + 1;
                        saw_paren = false;
                    }
                }
                TokenKind::Punct('(') | TokenKind::Punct(')') => saw_paren = true,
                TokenKind::Punct(';') if depth == 0 => {
                    out.push(&body[start..i]);
                    start = i + 1;
                    saw_paren = false;
                }
                _ => {}
            }
        }
        out.push(&body[start..]);
        out.retain(|s| !s.is_empty());
        out
    }

    fn parse_statement(&self, struct_name: &str, stmt: &[Token]) -> Result<Option<FieldDecl>> {
        let mut toks = stmt;
        while toks.len() >= 2
            && toks[1].is_punct(':')
            && ACCESS_SPECIFIERS
                .iter()
                .any(|kw| toks[0].is_ident(&self.text, kw))
        {
            toks = &toks[2..];
        }
        let Some(first) = toks.first() else {
            return Ok(None);
        };

        if toks.iter().any(|t| t.is_punct('(') || t.is_punct(')')) {
            trace!("{struct_name}: skipping member function `{}`", self.span_text(toks));
            return Ok(None);
        }
        if SKIPPED_KEYWORDS
            .iter()
            .any(|kw| first.is_ident(&self.text, kw))
        {
            trace!("{struct_name}: skipping nested declaration");
            return Ok(None);
        }

        let decl = match toks.iter().position(|t| t.is_punct('=')) {
            Some(eq) => &toks[..eq],
            None => toks,
        };
        match self.recognize(decl) {
            Some(field) => Ok(Some(field)),
            None => Err(GenError::BadDeclaration {
                struct_name: struct_name.to_string(),
                statement: self.span_text(toks).to_string(),
            }),
        }
    }

    /// Match `<qualified-type> <identifier> ([<dim-expr>])*`.
    fn recognize(&self, toks: &[Token]) -> Option<FieldDecl> {
        let mut i = 0;
        let type_start = toks.get(i)?;
        if type_start.kind != TokenKind::Ident {
            return None;
        }
        i += 1;
        while toks.get(i).map(|t| t.kind) == Some(TokenKind::PathSep) {
            if toks.get(i + 1)?.kind != TokenKind::Ident {
                return None;
            }
            i += 2;
        }
        let type_name: String = toks[..i].iter().map(|t| t.text(&self.text)).collect();

        let name_tok = toks.get(i)?;
        if name_tok.kind != TokenKind::Ident {
            return None;
        }
        i += 1;

        let mut dims = Vec::new();
        while i < toks.len() {
            if !toks[i].is_punct('[') {
                return None;
            }
            let close = matching_bracket(toks, i)?;
            let expr = self.text[toks[i].end..toks[close].start].trim();
            if expr.is_empty() {
                return None;
            }
            dims.push(expr.to_string());
            i = close + 1;
        }

        Some(FieldDecl {
            type_name,
            name: name_tok.text(&self.text).to_string(),
            dims,
        })
    }

    fn span_text(&self, toks: &[Token]) -> &str {
        match (toks.first(), toks.last()) {
            (Some(first), Some(last)) => &self.text[first.start..last.end],
            _ => "",
        }
    }
}

fn matching_bracket(toks: &[Token], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, tok) in toks.iter().enumerate().skip(open) {
        if tok.is_punct('[') {
            depth += 1;
        } else if tok.is_punct(']') {
            depth -= 1;
            if depth == 0 {
                return Some(i);
            }
        }
    }
    None
}

/// Extract a single struct from raw header text.
pub fn extract(header_text: &str, struct_name: &str) -> Result<StructModel> {
    Header::parse(header_text).extract(struct_name)
}

/// Extracted structs, kept in first-requested order.
#[derive(Clone, Debug, Default)]
pub struct StructSet {
    models: Vec<StructModel>,
}

impl StructSet {
    /// Extract every named struct once, preserving first-seen order.
    pub fn extract<'a>(header: &Header, names: impl IntoIterator<Item = &'a str>) -> Result<Self> {
        let mut set = StructSet::default();
        for name in names {
            if set.get(name).is_none() {
                set.models.push(header.extract(name)?);
            }
        }
        Ok(set)
    }

    pub fn get(&self, name: &str) -> Option<&StructModel> {
        self.models.iter().find(|m| m.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &StructModel> {
        self.models.iter()
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Distinct dimension expressions over all structs, in first-seen order.
    pub fn dim_exprs(&self) -> Vec<String> {
        let mut exprs: Vec<String> = Vec::new();
        for field in self.models.iter().flat_map(|m| &m.fields) {
            for dim in &field.dims {
                if !exprs.contains(dim) {
                    exprs.push(dim.clone());
                }
            }
        }
        exprs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(type_name: &str, name: &str, dims: &[&str]) -> FieldDecl {
        FieldDecl {
            type_name: type_name.to_string(),
            name: name.to_string(),
            dims: dims.iter().map(|d| d.to_string()).collect(),
        }
    }

    #[test]
    fn test_extract_simple() {
        let model = extract("struct S { bool a; uint32 b[2]; };", "S").unwrap();
        assert_eq!(model.name, "S");
        assert_eq!(
            model.fields,
            vec![field("bool", "a", &[]), field("uint32", "b", &["2"])]
        );
    }

    #[test]
    fn test_extract_multi_dim_and_qualified_type() {
        let src = r#"
namespace icache_n {
struct ICache_regs_t {
  uint32_t cache_data[ICACHE_SET_NUM][ICACHE_WAYS * 2];
  std::uint8_t lru[ arr[1] ];
  icache_n::wire7_t tag;
};
}
"#;
        let model = extract(src, "ICache_regs_t").unwrap();
        assert_eq!(
            model.fields,
            vec![
                field("uint32_t", "cache_data", &["ICACHE_SET_NUM", "ICACHE_WAYS * 2"]),
                field("std::uint8_t", "lru", &["arr[1]"]),
                field("icache_n::wire7_t", "tag", &[]),
            ]
        );
    }

    #[test]
    fn test_extract_skips_comments_methods_and_nested_types() {
        let src = r#"
struct M {
  // bool commented_out;
  /* uint8 also_gone; */
  enum class Mode { A, B };
  struct Inner { uint8 x; uint8 y; } ;
  using word_t = uint32_t;
  void reset() { valid = false; count = 0; }
  bool valid = true;
  uint8 count{};
  M() : valid(false) {}
  M(bool v) : valid{v}, count{0} {}
  uint64 next_pc() const;
  uint16 tail;
};
"#;
        let err = extract(src, "M").unwrap_err();
        // `uint8 count{}` is a brace initializer, which is outside the subset.
        assert!(matches!(err, GenError::BadDeclaration { .. }), "{err}");

        let src = src.replace("uint8 count{};", "uint8 count = 0;");
        let model = extract(&src, "M").unwrap();
        assert_eq!(
            model.fields,
            vec![
                field("bool", "valid", &[]),
                field("uint8", "count", &[]),
                field("uint16", "tail", &[]),
            ]
        );
    }

    #[test]
    fn test_extract_brace_initializer_constructor() {
        let model = extract(
            "struct M { bool a; uint8 b; M() : a{false}, b{0} {} bool z; };",
            "M",
        )
        .unwrap();
        assert_eq!(
            model.fields,
            vec![
                field("bool", "a", &[]),
                field("uint8", "b", &[]),
                field("bool", "z", &[]),
            ]
        );
    }

    #[test]
    fn test_bit_count_overflow_is_an_error() {
        let model = extract("struct H { uint64 big[A][B]; };", "H").unwrap();
        let dims = crate::dims::DimensionTable::new()
            .with("A", 1 << 40)
            .with("B", 1 << 40);
        assert!(matches!(
            model.bit_count(&WidthTable::new(), &dims),
            Err(GenError::Evaluation(_))
        ));
    }

    #[test]
    fn test_extract_access_specifiers() {
        let src = "struct P { public: bool a; private: uint8 b; };";
        let model = extract(src, "P").unwrap();
        assert_eq!(
            model.fields,
            vec![field("bool", "a", &[]), field("uint8", "b", &[])]
        );
    }

    #[test]
    fn test_extract_array_initializer() {
        let model = extract("struct A { uint8 v[2] = {1, 2}; bool z; };", "A").unwrap();
        assert_eq!(
            model.fields,
            vec![field("uint8", "v", &["2"]), field("bool", "z", &[])]
        );
    }

    #[test]
    fn test_extract_last_statement_without_semicolon() {
        let model = extract("struct L { bool a; bool b }", "L").unwrap();
        assert_eq!(model.fields.len(), 2);
    }

    #[test]
    fn test_extract_empty_struct() {
        let model = extract("struct E {};", "E").unwrap();
        assert!(model.fields.is_empty());
    }

    #[test]
    fn test_struct_not_found() {
        let err = extract("struct A { bool a; };", "B").unwrap_err();
        assert!(matches!(err, GenError::StructNotFound(ref n) if n == "B"));
        // A forward declaration is not a definition.
        let err = extract("struct B; struct A { B b; };", "B").unwrap_err();
        assert!(matches!(err, GenError::StructNotFound(_)));
    }

    #[test]
    fn test_name_must_match_whole_identifier() {
        let err = extract("struct AB { bool a; };", "A").unwrap_err();
        assert!(matches!(err, GenError::StructNotFound(_)));
    }

    #[test]
    fn test_unterminated_body() {
        let err = extract("struct U { bool a; struct { bool b; };", "U").unwrap_err();
        assert!(matches!(err, GenError::UnterminatedStruct(ref n) if n == "U"));
    }

    #[test]
    fn test_bad_declaration_names_statement() {
        let err = extract("struct B { bool ok; unsigned int x; };", "B").unwrap_err();
        match err {
            GenError::BadDeclaration {
                struct_name,
                statement,
            } => {
                assert_eq!(struct_name, "B");
                assert_eq!(statement, "unsigned int x");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_bad_declaration_shapes() {
        for body in [
            "std::array<uint8, 4> a;",
            "uint8 a[];",
            "uint8 a[4] extra;",
            "static constexpr int N = 4;",
            "uint8 *ptr;",
            "uint8 a[4;",
        ] {
            let src = format!("struct X {{ {body} }};");
            assert!(
                matches!(extract(&src, "X"), Err(GenError::BadDeclaration { .. })),
                "{body} should be rejected"
            );
        }
    }

    #[test]
    fn test_struct_set_order_and_dims() {
        let header = Header::parse(
            "struct A { uint8 x[N]; bool y[M][N]; }; struct B { uint8 z[M]; uint8 w[K]; };",
        );
        let set = StructSet::extract(&header, ["B", "A", "B"]).unwrap();
        assert_eq!(set.len(), 2);
        let names: Vec<_> = set.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, ["B", "A"]);
        assert_eq!(set.dim_exprs(), ["M", "K", "N"]);
    }
}
