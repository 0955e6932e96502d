//! Top-level item parsing: functions, classes, unions, typedefs,
//! imports, namespaces, and `[[...]]` attribute lists.

use lumen_ir::ast::{
    Accessibility, AttrSet, BuiltinKind, ClassDef, ClassMember, FieldDef, FunctionDecl,
    FunctionDef, Item, ItemKind, Param, ParamList, ParsedType, UnionDef, UnionTag,
};
use lumen_ir::{Name, TokenKind};

use crate::{ParseError, Parser};

impl Parser<'_> {
    pub(crate) fn parse_item(&mut self) -> Result<Item, ParseError> {
        let start = self.cursor.current_span();
        let attrs = self.parse_attrs()?;

        // Visibility prefix. Items default to public linkage.
        let is_public = if self.cursor.eat(&TokenKind::Private) {
            false
        } else {
            self.cursor.eat(&TokenKind::Public);
            true
        };

        let kind = match self.cursor.current_kind() {
            TokenKind::Extern => self.parse_extern_decl()?,
            TokenKind::Func => {
                let def = self.parse_function_def(is_public)?;
                ItemKind::FunctionDef(def)
            }
            TokenKind::Class => self.parse_class(is_public)?,
            TokenKind::Union => self.parse_union(is_public)?,
            TokenKind::Typedef => self.parse_typedef()?,
            TokenKind::Import => self.parse_import()?,
            TokenKind::Namespace => self.parse_namespace()?,
            _ => return Err(self.cursor.expected("top-level item")),
        };

        let span = start.merge(self.cursor.previous_span());
        Ok(Item { attrs, kind, span })
    }

    /// `[[attr, attr]]` — only `nodiscard` and `nomangle` exist.
    fn parse_attrs(&mut self) -> Result<AttrSet, ParseError> {
        let mut attrs = AttrSet::default();

        if !self.cursor.check(&TokenKind::LBracket)
            || self.cursor.peek_next_kind().tag() != TokenKind::LBracket.tag()
        {
            return Ok(attrs);
        }
        self.cursor.advance();
        self.cursor.advance();

        loop {
            let (name, span) = self.cursor.expect_ident()?;
            match self.cursor.interner().lookup(name) {
                "nodiscard" => attrs.nodiscard = true,
                "nomangle" => attrs.nomangle = true,
                other => {
                    return Err(ParseError::new(
                        "attribute 'nodiscard' or 'nomangle'",
                        format!("'{other}'"),
                        span,
                    ))
                }
            }
            if !self.cursor.eat(&TokenKind::Comma) {
                break;
            }
        }

        self.cursor.expect(&TokenKind::RBracket)?;
        self.cursor.expect(&TokenKind::RBracket)?;
        Ok(attrs)
    }

    /// `extern func name(params) -> T;`
    fn parse_extern_decl(&mut self) -> Result<ItemKind, ParseError> {
        self.cursor.expect(&TokenKind::Extern)?;
        let decl = self.parse_function_proto()?;
        self.cursor.expect(&TokenKind::Semi)?;
        Ok(ItemKind::FunctionDecl(decl))
    }

    /// `func name[<T, ...>](params) [-> T] { body }`
    fn parse_function_def(&mut self, is_public: bool) -> Result<FunctionDef, ParseError> {
        let decl = self.parse_function_proto()?;
        let body = self.parse_compound()?;
        Ok(FunctionDef {
            is_public,
            decl,
            body,
        })
    }

    fn parse_function_proto(&mut self) -> Result<FunctionDecl, ParseError> {
        let start = self.cursor.expect(&TokenKind::Func)?;
        let name = self.parse_function_name()?;

        let template_params = if self.cursor.check(&TokenKind::Lt) {
            self.parse_template_params()?
        } else {
            Vec::new()
        };

        let params = self.parse_params()?;

        let return_ty = if self.cursor.eat(&TokenKind::Arrow) {
            self.parse_type()?
        } else {
            ParsedType::Builtin(BuiltinKind::Void)
        };

        Ok(FunctionDecl {
            name,
            template_params,
            params,
            return_ty,
            accessibility: Accessibility::NonMethod,
            is_constructor: false,
            is_destructor: false,
            span: start.merge(self.cursor.previous_span()),
        })
    }

    /// Function names are identifiers, plus the reserved `new` and
    /// `delete` inside class bodies.
    fn parse_function_name(&mut self) -> Result<Name, ParseError> {
        match *self.cursor.current_kind() {
            TokenKind::Ident(name) => {
                self.cursor.advance();
                Ok(name)
            }
            TokenKind::New => {
                self.cursor.advance();
                Ok(self.cursor.interner().intern("new"))
            }
            TokenKind::Delete => {
                self.cursor.advance();
                Ok(self.cursor.interner().intern("delete"))
            }
            _ => Err(self.cursor.expected("function name")),
        }
    }

    /// `<T, U>` — template parameter names.
    fn parse_template_params(&mut self) -> Result<Vec<Name>, ParseError> {
        self.cursor.expect(&TokenKind::Lt)?;
        let mut params = vec![self.cursor.expect_ident()?.0];
        while self.cursor.eat(&TokenKind::Comma) {
            params.push(self.cursor.expect_ident()?.0);
        }
        self.cursor.expect(&TokenKind::Gt)?;
        Ok(params)
    }

    /// `([mutable] name: T, ..., [...])`
    fn parse_params(&mut self) -> Result<ParamList, ParseError> {
        self.cursor.expect(&TokenKind::LParen)?;

        let mut list = ParamList::default();
        if self.cursor.eat(&TokenKind::RParen) {
            return Ok(list);
        }

        loop {
            if self.cursor.check(&TokenKind::DotDotDot) {
                let span = self.cursor.current_span();
                self.cursor.advance();
                list.is_vararg = true;
                if !self.cursor.check(&TokenKind::RParen) {
                    return Err(ParseError::new(
                        "')' after '...'",
                        self.cursor.current_kind().describe(),
                        span,
                    ));
                }
                break;
            }

            let param_start = self.cursor.current_span();
            let is_mutable = self.cursor.eat(&TokenKind::Mutable);
            let (name, _) = self.cursor.expect_ident()?;
            self.cursor.expect(&TokenKind::Colon)?;
            let ty = self.parse_type()?;
            list.params.push(Param {
                name,
                is_mutable,
                ty,
                span: param_start.merge(self.cursor.previous_span()),
            });

            if !self.cursor.eat(&TokenKind::Comma) {
                break;
            }
        }

        self.cursor.expect(&TokenKind::RParen)?;
        Ok(list)
    }

    /// `class Name;` or `class Name[<T, ...>] { members }`.
    fn parse_class(&mut self, is_public: bool) -> Result<ItemKind, ParseError> {
        let start = self.cursor.expect(&TokenKind::Class)?;
        let (name, _) = self.cursor.expect_ident()?;

        if self.cursor.eat(&TokenKind::Semi) {
            return Ok(ItemKind::ClassDecl(name));
        }

        let template_params = if self.cursor.check(&TokenKind::Lt) {
            self.parse_template_params()?
        } else {
            Vec::new()
        };

        self.cursor.expect(&TokenKind::LBrace)?;
        let mut members = Vec::new();
        while !self.cursor.check(&TokenKind::RBrace) && !self.cursor.is_at_end() {
            members.push(self.parse_class_member()?);
        }
        self.cursor.expect(&TokenKind::RBrace)?;

        Ok(ItemKind::ClassDef(ClassDef {
            is_public,
            name,
            template_params,
            members,
            span: start.merge(self.cursor.previous_span()),
        }))
    }

    fn parse_class_member(&mut self) -> Result<ClassMember, ParseError> {
        match self.cursor.current_kind() {
            TokenKind::Public => {
                self.cursor.advance();
                self.cursor.expect(&TokenKind::Colon)?;
                Ok(ClassMember::Access(Accessibility::Public))
            }
            TokenKind::Private => {
                self.cursor.advance();
                self.cursor.expect(&TokenKind::Colon)?;
                Ok(ClassMember::Access(Accessibility::Private))
            }
            TokenKind::Var => self.parse_field(),
            TokenKind::Func => {
                let is_ctor = self.cursor.peek_next_kind().tag() == TokenKind::New.tag();
                let is_dtor = self.cursor.peek_next_kind().tag() == TokenKind::Delete.tag();
                let mut def = self.parse_function_def(true)?;
                if is_ctor {
                    def.decl.is_constructor = true;
                    Ok(ClassMember::Constructor(def))
                } else if is_dtor {
                    def.decl.is_destructor = true;
                    Ok(ClassMember::Destructor(def))
                } else {
                    Ok(ClassMember::Method(def))
                }
            }
            _ => Err(self.cursor.expected("class member")),
        }
    }

    /// `var name: T [= default];`
    fn parse_field(&mut self) -> Result<ClassMember, ParseError> {
        let start = self.cursor.expect(&TokenKind::Var)?;
        let (name, _) = self.cursor.expect_ident()?;
        self.cursor.expect(&TokenKind::Colon)?;
        let ty = self.parse_type()?;
        let init = if self.cursor.eat(&TokenKind::Eq) {
            Some(self.parse_expr()?)
        } else {
            None
        };
        self.cursor.expect(&TokenKind::Semi)?;
        Ok(ClassMember::Field(FieldDef {
            name,
            ty,
            init,
            span: start.merge(self.cursor.previous_span()),
        }))
    }

    /// `union Name[<T, ...>] { tag: T, ... }`
    fn parse_union(&mut self, is_public: bool) -> Result<ItemKind, ParseError> {
        let start = self.cursor.expect(&TokenKind::Union)?;
        let (name, _) = self.cursor.expect_ident()?;

        let template_params = if self.cursor.check(&TokenKind::Lt) {
            self.parse_template_params()?
        } else {
            Vec::new()
        };

        self.cursor.expect(&TokenKind::LBrace)?;
        let mut tags = Vec::new();
        while !self.cursor.check(&TokenKind::RBrace) && !self.cursor.is_at_end() {
            let tag_start = self.cursor.current_span();
            let (tag_name, _) = self.cursor.expect_ident()?;
            self.cursor.expect(&TokenKind::Colon)?;
            let ty = self.parse_type()?;
            tags.push(UnionTag {
                name: tag_name,
                ty,
                span: tag_start.merge(self.cursor.previous_span()),
            });
            if !self.cursor.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.cursor.expect(&TokenKind::RBrace)?;

        Ok(ItemKind::UnionDef(UnionDef {
            is_public,
            name,
            template_params,
            tags,
            span: start.merge(self.cursor.previous_span()),
        }))
    }

    /// `typedef Alias = T;`
    fn parse_typedef(&mut self) -> Result<ItemKind, ParseError> {
        self.cursor.expect(&TokenKind::Typedef)?;
        let (alias, _) = self.cursor.expect_ident()?;
        self.cursor.expect(&TokenKind::Eq)?;
        let ty = self.parse_type()?;
        self.cursor.expect(&TokenKind::Semi)?;
        Ok(ItemKind::Typedef { alias, ty })
    }

    /// `import "path";`
    fn parse_import(&mut self) -> Result<ItemKind, ParseError> {
        self.cursor.expect(&TokenKind::Import)?;
        let path = match *self.cursor.current_kind() {
            TokenKind::Str(path) => {
                self.cursor.advance();
                path
            }
            _ => return Err(self.cursor.expected("import path string")),
        };
        self.cursor.expect(&TokenKind::Semi)?;
        Ok(ItemKind::Import { path })
    }

    /// `namespace Name { items }`
    fn parse_namespace(&mut self) -> Result<ItemKind, ParseError> {
        self.cursor.expect(&TokenKind::Namespace)?;
        let (name, _) = self.cursor.expect_ident()?;
        self.cursor.expect(&TokenKind::LBrace)?;

        let mut items = Vec::new();
        while !self.cursor.check(&TokenKind::RBrace) && !self.cursor.is_at_end() {
            let item = self.parse_item()?;
            if matches!(item.kind, ItemKind::Import { .. }) {
                return Err(ParseError::new(
                    "a file-scoped import (imports are not allowed inside namespaces)",
                    "'import'",
                    item.span,
                ));
            }
            items.push(item);
        }
        self.cursor.expect(&TokenKind::RBrace)?;
        Ok(ItemKind::Namespace { name, items })
    }
}
