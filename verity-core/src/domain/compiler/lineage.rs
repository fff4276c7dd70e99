// verity-core/src/domain/compiler/lineage.rs
//
// Column-lineage extraction: walks the AST of a rendered SELECT and
// builds one `ColumnLineage` per top-level projection item, reusing the
// same traversal shape as `UniversalQuoter` (recurse into every
// sub-expression, recording identifiers and function calls along the
// way) but collecting provenance instead of rewriting quoting.

use crate::domain::lineage::ColumnLineage;
use sqlparser::ast::{
    Expr, FunctionArg, FunctionArgExpr, FunctionArguments, Query, Select, SelectItem, SetExpr,
    Statement, TableFactor,
};
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;

/// Extracts per-output-column lineage from a rendered SELECT statement.
/// Unqualified column references are attributed to the query's sole FROM
/// table when there is exactly one; otherwise the table half is left
/// empty (ambiguous without a full binder).
pub fn extract_column_lineage(sql: &str) -> Result<Vec<ColumnLineage>, anyhow::Error> {
    let dialect = GenericDialect {};
    let ast = Parser::parse_sql(&dialect, sql)?;

    let mut lineage = Vec::new();
    for stmt in &ast {
        if let Statement::Query(query) = stmt {
            extract_from_query(query, &mut lineage);
        }
    }
    Ok(lineage)
}

fn extract_from_query(query: &Query, out: &mut Vec<ColumnLineage>) {
    if let SetExpr::Select(select) = query.body.as_ref() {
        let default_table = sole_from_table(select);
        for (idx, item) in select.projection.iter().enumerate() {
            if let Some(col) = lineage_for_item(item, idx, default_table.as_deref()) {
                out.push(col);
            }
        }
    }
}

fn sole_from_table(select: &Select) -> Option<String> {
    if select.from.len() != 1 || !select.from[0].joins.is_empty() {
        return None;
    }
    match &select.from[0].relation {
        TableFactor::Table { name, .. } => Some(name.to_string()),
        _ => None,
    }
}

fn lineage_for_item(
    item: &SelectItem,
    idx: usize,
    default_table: Option<&str>,
) -> Option<ColumnLineage> {
    let (name, expr) = match item {
        SelectItem::UnnamedExpr(expr) => (column_name_of(expr, idx), expr),
        SelectItem::ExprWithAlias { expr, alias } => (alias.value.clone(), expr),
        _ => return None,
    };

    let mut column = ColumnLineage::new(name);
    walk_expr(expr, default_table, &mut column);
    Some(column)
}

fn column_name_of(expr: &Expr, idx: usize) -> String {
    match expr {
        Expr::Identifier(ident) => ident.value.clone(),
        Expr::CompoundIdentifier(parts) => parts
            .last()
            .map(|p| p.value.clone())
            .unwrap_or_else(|| format!("column_{idx}")),
        _ => format!("column_{idx}"),
    }
}

fn walk_expr(expr: &Expr, default_table: Option<&str>, column: &mut ColumnLineage) {
    match expr {
        Expr::Identifier(ident) => {
            let table = default_table.unwrap_or("").to_string();
            column.source_columns.push((table, ident.value.clone()));
        }
        Expr::CompoundIdentifier(parts) => {
            if parts.len() >= 2 {
                let table = parts[parts.len() - 2].value.clone();
                let col = parts[parts.len() - 1].value.clone();
                column.source_columns.push((table, col));
            }
        }
        Expr::BinaryOp { left, right, .. } => {
            walk_expr(left, default_table, column);
            walk_expr(right, default_table, column);
        }
        Expr::UnaryOp { expr, .. } | Expr::Nested(expr) | Expr::Cast { expr, .. } => {
            walk_expr(expr, default_table, column);
        }
        Expr::Function(func) => {
            column.transformations.push(func.name.to_string().to_lowercase());
            if let FunctionArguments::List(list) = &func.args {
                for arg in &list.args {
                    let arg_expr = match arg {
                        FunctionArg::Unnamed(FunctionArgExpr::Expr(e)) => Some(e),
                        FunctionArg::Named {
                            arg: FunctionArgExpr::Expr(e),
                            ..
                        } => Some(e),
                        _ => None,
                    };
                    if let Some(e) = arg_expr {
                        walk_expr(e, default_table, column);
                    }
                }
            }
        }
        Expr::Case {
            operand,
            conditions,
            else_result,
            ..
        } => {
            if let Some(op) = operand {
                walk_expr(op, default_table, column);
            }
            for cw in conditions {
                walk_expr(&cw.condition, default_table, column);
                walk_expr(&cw.result, default_table, column);
            }
            if let Some(el) = else_result {
                walk_expr(el, default_table, column);
            }
        }
        Expr::IsNull(e) | Expr::IsNotNull(e) => walk_expr(e, default_table, column),
        Expr::InList { expr, list, .. } => {
            walk_expr(expr, default_table, column);
            for item in list {
                walk_expr(item, default_table, column);
            }
        }
        Expr::Between {
            expr, low, high, ..
        } => {
            walk_expr(expr, default_table, column);
            walk_expr(low, default_table, column);
            walk_expr(high, default_table, column);
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_column_reference_attributed_to_sole_table() {
        let lineage = extract_column_lineage("SELECT amount FROM orders").unwrap();
        assert_eq!(lineage.len(), 1);
        assert_eq!(lineage[0].column_name, "amount");
        assert_eq!(lineage[0].source_columns, vec![("orders".to_string(), "amount".to_string())]);
    }

    #[test]
    fn qualified_reference_uses_its_own_table() {
        let lineage = extract_column_lineage("SELECT o.amount FROM orders o").unwrap();
        assert_eq!(lineage[0].source_columns, vec![("o".to_string(), "amount".to_string())]);
    }

    #[test]
    fn function_call_records_a_transformation_tag() {
        let lineage =
            extract_column_lineage("SELECT SUM(amount) AS total_amount FROM orders").unwrap();
        assert_eq!(lineage[0].column_name, "total_amount");
        assert_eq!(lineage[0].transformations, vec!["sum".to_string()]);
        assert_eq!(
            lineage[0].source_columns,
            vec![("orders".to_string(), "amount".to_string())]
        );
    }
}
