use crate::ast::{Expr, FunctionDecl, LiteralValue, Param, Stmt};

/// Renders the AST in parenthesised prefix form, one line per top-level
/// statement. Used by the `parse` subcommand.
pub struct AstPrinter;

impl AstPrinter {
    pub fn print(expr: &Expr) -> String {
        match expr {
            // ── literals ────────────────────────────────────────────────
            Expr::Literal(lit) => match lit {
                LiteralValue::Bool(b) => b.to_string(),

                LiteralValue::Nil => "nil".into(),

                LiteralValue::Str(s) => s.clone(),

                // 3 → "3.0"
                LiteralValue::Number(n) if n.fract() == 0.0 => format!("{:.1}", n),
                LiteralValue::Number(n) => n.to_string(),
            },

            Expr::Grouping(inner) => format!("(group {})", Self::print(inner)),

            Expr::Unary { operator, right } => {
                format!("({} {})", operator.lexeme, Self::print(right))
            }

            Expr::Binary {
                left,
                operator,
                right,
            }
            | Expr::Logical {
                left,
                operator,
                right,
            } => Self::parenthesize(&operator.lexeme, [left.as_ref(), right.as_ref()]),

            Expr::Ternary {
                condition,
                then_branch,
                else_branch,
                ..
            } => Self::parenthesize("?:", [condition.as_ref(), then_branch.as_ref(), else_branch.as_ref()]),

            Expr::Comma(exprs) => Self::parenthesize(",", exprs),

            // ── bindings ────────────────────────────────────────────────
            Expr::Variable { name, .. } => name.lexeme.clone(),

            Expr::Assign { name, value, .. } => {
                format!("(= {} {})", name.lexeme, Self::print(value))
            }

            Expr::CompoundAssign {
                name,
                operator,
                value,
                ..
            } => format!("({} {} {})", operator.lexeme, name.lexeme, Self::print(value)),

            Expr::Update {
                operator,
                target,
                prefix,
            } => {
                let fixity: &str = if *prefix { "pre" } else { "post" };
                format!("({}{} {})", fixity, operator.lexeme, Self::print(target))
            }

            // ── calls and properties ────────────────────────────────────
            Expr::Call {
                callee, arguments, ..
            } => {
                let mut s = format!("(call {}", Self::print(callee));
                for arg in arguments {
                    s.push(' ');
                    s.push_str(&Self::print(arg));
                }
                s.push(')');
                s
            }

            Expr::Get { object, name } => format!("(. {} {})", Self::print(object), name.lexeme),

            Expr::Set {
                object,
                name,
                value,
            } => format!(
                "(= (. {} {}) {})",
                Self::print(object),
                name.lexeme,
                Self::print(value)
            ),

            Expr::CompoundSet {
                object,
                name,
                operator,
                value,
            } => format!(
                "({} (. {} {}) {})",
                operator.lexeme,
                Self::print(object),
                name.lexeme,
                Self::print(value)
            ),

            Expr::This { .. } => "this".into(),

            Expr::Super { method, .. } => format!("(super {})", method.lexeme),
        }
    }

    pub fn print_stmt(stmt: &Stmt) -> String {
        match stmt {
            Stmt::Expression(expr) => format!("(; {})", Self::print(expr)),

            Stmt::Var { name, initializer } => match initializer {
                Some(init) => format!("(var {} {})", name.lexeme, Self::print(init)),
                None => format!("(var {})", name.lexeme),
            },

            Stmt::Block(statements) => Self::wrap("block", statements.iter().map(Self::print_stmt)),

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => match else_branch {
                Some(else_branch) => format!(
                    "(if {} {} {})",
                    Self::print(condition),
                    Self::print_stmt(then_branch),
                    Self::print_stmt(else_branch)
                ),
                None => format!(
                    "(if {} {})",
                    Self::print(condition),
                    Self::print_stmt(then_branch)
                ),
            },

            Stmt::While { condition, body } => {
                format!("(while {} {})", Self::print(condition), Self::print_stmt(body))
            }

            Stmt::For {
                condition,
                increment,
                body,
            } => format!(
                "(for {} {} {})",
                Self::print(condition),
                increment.as_ref().map_or_else(|| "nil".to_string(), Self::print),
                Self::print_stmt(body)
            ),

            Stmt::Function(decl) => Self::function("func", decl),

            Stmt::Return { value, .. } => match value {
                Some(value) => format!("(return {})", Self::print(value)),
                None => "(return)".into(),
            },

            Stmt::Break(_) => "(break)".into(),

            Stmt::Next(_) => "(next)".into(),

            Stmt::Class {
                name,
                superclass,
                methods,
                static_methods,
            } => {
                let mut parts: Vec<String> = vec![name.lexeme.clone()];
                if let Some(superclass) = superclass {
                    parts.push(format!("(< {})", Self::print(superclass)));
                }
                parts.extend(methods.iter().map(|m| Self::function("method", m)));
                parts.extend(static_methods.iter().map(|m| Self::function("static", m)));
                Self::wrap("class", parts.into_iter())
            }
        }
    }

    fn function(keyword: &str, decl: &FunctionDecl) -> String {
        let params: Vec<String> = decl.params.iter().map(Self::param).collect();
        let head: String = format!("{} ({})", decl.name.lexeme, params.join(" "));

        Self::wrap(
            keyword,
            std::iter::once(head).chain(decl.body.iter().map(Self::print_stmt)),
        )
    }

    fn param(param: &Param) -> String {
        match &param.default {
            Some(default) => format!("(= {} {})", param.name.lexeme, Self::print(default)),
            None => param.name.lexeme.clone(),
        }
    }

    fn parenthesize<'e>(name: &str, exprs: impl IntoIterator<Item = &'e Expr>) -> String {
        Self::wrap(name, exprs.into_iter().map(Self::print))
    }

    fn wrap(name: &str, parts: impl Iterator<Item = String>) -> String {
        let mut s = format!("({}", name);
        for part in parts {
            s.push(' ');
            s.push_str(&part);
        }
        s.push(')');
        s
    }
}
