//! Tree assembly for cube queries.

use super::{selector, ActivityPlan, Page, BLANK_PLACEHOLDER, CPU_WAIT_EVENT};
use crate::{
    dimension::Dimension,
    promql::{BinaryOp, BinaryOperator, Node, RangeWindow},
};

pub(super) fn build(plan: &ActivityPlan) -> Node {
    let base: Node = selector::build(plan).into();

    let Some(dim) = plan.dim.label() else {
        return Node::count_by(plan.legend.label(), base);
    };

    let mut expr = fill_blank_label(base, plan.dim);
    if plan.legend != plan.dim {
        expr = fill_blank_label(expr, plan.legend);
    }

    let window = RangeWindow::new(plan.range.window());
    let legend = plan.legend.label().filter(|legend| *legend != dim);

    let tree = match (legend, plan.page) {
        (None, page) => build_ranked_filter(expr, dim, &window, page),
        (Some(legend), None) => Node::avg_over_time(Node::count_by([dim, legend], expr), window),
        (Some(legend), Some(page)) => {
            let ranked = build_ranked_filter(expr.clone(), dim, &window, Some(page));
            let mask = BinaryOp::new(ranked, BinaryOperator::Gt, Node::IntLiteral(0)).bool_result();
            let filtered = BinaryOp::new(expr, BinaryOperator::Mul, mask.into())
                .on([dim])
                .group_left(Vec::<String>::new());
            Node::avg_over_time(Node::count_by([dim, legend], filtered.into()), window)
        }
    };

    Node::sort_desc(tree)
}

/// Ranks `dim` values by average connection count over the window, keeping
/// only the requested page. Pagination relies on the store ranking ties the
/// same way in both the `topk` and `bottomk` passes.
fn build_ranked_filter(expr: Node, dim: &str, window: &RangeWindow, page: Option<Page>) -> Node {
    let ranked = Node::avg_over_time(Node::count_by([dim], expr), window.clone());

    match page {
        None => ranked,
        Some(page) => {
            let top = Node::topk(page.depth(), ranked);
            if page.offset > 0 {
                Node::bottomk(page.limit, top)
            } else {
                top
            }
        }
    }
}

/// Gives series with a missing or empty `dim` label a visible value.
fn fill_blank_label(expr: Node, dim: Dimension) -> Node {
    match dim {
        Dimension::Time => expr,
        Dimension::WaitEventName => {
            let label = dim.as_str();
            let joined = Node::label_join(expr, label, ":", &["wait_event_type", "wait_event"]);
            Node::label_replace(joined, label, CPU_WAIT_EVENT, label, ":")
        }
        other => {
            let label = other.as_str();
            Node::label_replace(expr, label, BLANK_PLACEHOLDER, label, "")
        }
    }
}
