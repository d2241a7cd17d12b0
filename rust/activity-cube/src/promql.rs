//! Expression tree for the Prometheus-compatible query language.
//!
//! Nodes own their children outright and render through [`fmt::Display`].
//! Rendering never fails and is a pure function of the subtree, so identical
//! trees always produce identical text. Constructors are responsible for
//! building well-formed trees.

use std::{collections::HashMap, fmt};

/// Metric every activity query and rule reads from.
pub const ACTIVITY_METRIC: &str = "cc_pg_stat_activity";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Selector(Selector),
    Aggregation(Aggregation),
    FunctionCall(FunctionCall),
    LabelRewrite(LabelRewrite),
    TopN { n: i64, expr: Box<Node> },
    BottomN { n: i64, expr: Box<Node> },
    SortDesc(Box<Node>),
    BinaryOp(BinaryOp),
    IntLiteral(i64),
    StringLiteral(String),
}

/// `metric{label=~"pattern",...}`. Labels are kept unordered and sorted on render.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selector {
    pub metric: String,
    pub matchers: HashMap<String, String>,
}

impl Selector {
    pub fn new(metric: impl Into<String>) -> Self {
        Self {
            metric: metric.into(),
            matchers: HashMap::new(),
        }
    }

    /// Selector over the activity metric with no label constraints.
    pub fn activity() -> Self {
        Self::new(ACTIVITY_METRIC)
    }

    pub fn regex_match(mut self, label: impl Into<String>, pattern: impl Into<String>) -> Self {
        self.insert(label, pattern);
        self
    }

    pub fn insert(&mut self, label: impl Into<String>, pattern: impl Into<String>) {
        self.matchers.insert(label.into(), pattern.into());
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Aggregation {
    pub op: String,
    pub by: Vec<String>,
    pub expr: Box<Node>,
}

/// Range attached to a function argument: `[interval]` or `[interval:step]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeWindow {
    pub interval: String,
    pub step: Option<String>,
}

impl RangeWindow {
    pub fn new(interval: impl Into<String>) -> Self {
        Self {
            interval: interval.into(),
            step: None,
        }
    }

    pub fn with_step(interval: impl Into<String>, step: impl Into<String>) -> Self {
        Self {
            interval: interval.into(),
            step: Some(step.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionCall {
    pub name: String,
    pub args: Vec<Node>,
    pub range: Option<RangeWindow>,
}

/// `label_replace(expr, "dst", "replacement", "src", "regex")`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelRewrite {
    pub expr: Box<Node>,
    pub dst: String,
    pub replacement: String,
    pub src: String,
    pub regex: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Add,
    Sub,
    Mul,
    Div,
    Eq,
    Gt,
    Lt,
}

impl BinaryOperator {
    fn as_str(self) -> &'static str {
        match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Sub => "-",
            BinaryOperator::Mul => "*",
            BinaryOperator::Div => "/",
            BinaryOperator::Eq => "==",
            BinaryOperator::Gt => ">",
            BinaryOperator::Lt => "<",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupModifier {
    Left(Vec<String>),
    Right(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryOp {
    pub lhs: Box<Node>,
    pub op: BinaryOperator,
    pub rhs: Box<Node>,
    pub on: Option<Vec<String>>,
    pub group: Option<GroupModifier>,
    pub return_bool: bool,
}

impl BinaryOp {
    pub fn new(lhs: Node, op: BinaryOperator, rhs: Node) -> Self {
        Self {
            lhs: Box::new(lhs),
            op,
            rhs: Box::new(rhs),
            on: None,
            group: None,
            return_bool: false,
        }
    }

    pub fn on<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.on = Some(labels.into_iter().map(Into::into).collect());
        self
    }

    pub fn group_left<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.group = Some(GroupModifier::Left(
            labels.into_iter().map(Into::into).collect(),
        ));
        self
    }

    pub fn bool_result(mut self) -> Self {
        self.return_bool = true;
        self
    }
}

impl Node {
    pub fn aggregate<I, S>(op: &str, by: I, expr: Node) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Node::Aggregation(Aggregation {
            op: op.to_string(),
            by: by.into_iter().map(Into::into).collect(),
            expr: Box::new(expr),
        })
    }

    pub fn count_by<I, S>(by: I, expr: Node) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::aggregate("count", by, expr)
    }

    pub fn sum_by<I, S>(by: I, expr: Node) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::aggregate("sum", by, expr)
    }

    pub fn call(name: &str, args: Vec<Node>) -> Self {
        Node::FunctionCall(FunctionCall {
            name: name.to_string(),
            args,
            range: None,
        })
    }

    pub fn call_over_range(name: &str, args: Vec<Node>, range: RangeWindow) -> Self {
        Node::FunctionCall(FunctionCall {
            name: name.to_string(),
            args,
            range: Some(range),
        })
    }

    pub fn avg_over_time(expr: Node, range: RangeWindow) -> Self {
        Self::call_over_range("avg_over_time", vec![expr], range)
    }

    pub fn label_replace(expr: Node, dst: &str, replacement: &str, src: &str, regex: &str) -> Self {
        Node::LabelRewrite(LabelRewrite {
            expr: Box::new(expr),
            dst: dst.to_string(),
            replacement: replacement.to_string(),
            src: src.to_string(),
            regex: regex.to_string(),
        })
    }

    /// `label_join(expr, "dst", "separator", "src1", ...)`.
    pub fn label_join(expr: Node, dst: &str, separator: &str, sources: &[&str]) -> Self {
        let mut args = vec![
            expr,
            Node::string(dst),
            Node::string(separator),
        ];
        args.extend(sources.iter().map(|src| Node::string(*src)));
        Self::call("label_join", args)
    }

    pub fn topk(n: i64, expr: Node) -> Self {
        Node::TopN {
            n,
            expr: Box::new(expr),
        }
    }

    pub fn bottomk(n: i64, expr: Node) -> Self {
        Node::BottomN {
            n,
            expr: Box::new(expr),
        }
    }

    pub fn sort_desc(expr: Node) -> Self {
        Node::SortDesc(Box::new(expr))
    }

    pub fn string(value: impl Into<String>) -> Self {
        Node::StringLiteral(value.into())
    }

    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl From<Selector> for Node {
    fn from(selector: Selector) -> Self {
        Node::Selector(selector)
    }
}

impl From<BinaryOp> for Node {
    fn from(op: BinaryOp) -> Self {
        Node::BinaryOp(op)
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Selector(selector) => selector.fmt(f),
            Node::Aggregation(agg) => {
                f.write_str(&agg.op)?;
                if !agg.by.is_empty() {
                    write!(f, " by({})", agg.by.join(", "))?;
                }
                write!(f, "({})", agg.expr)
            }
            Node::FunctionCall(call) => {
                write!(f, "{}(", call.name)?;
                for (idx, arg) in call.args.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    arg.fmt(f)?;
                }
                if let Some(range) = &call.range {
                    match &range.step {
                        Some(step) => write!(f, "[{}:{}]", range.interval, step)?,
                        None => write!(f, "[{}]", range.interval)?,
                    }
                }
                f.write_str(")")
            }
            Node::LabelRewrite(rewrite) => {
                write!(f, "label_replace({}, ", rewrite.expr)?;
                write_quoted(f, &rewrite.dst)?;
                f.write_str(", ")?;
                write_quoted(f, &rewrite.replacement)?;
                f.write_str(", ")?;
                write_quoted(f, &rewrite.src)?;
                f.write_str(", ")?;
                write_quoted(f, &rewrite.regex)?;
                f.write_str(")")
            }
            Node::TopN { n, expr } => write!(f, "topk({n}, {expr})"),
            Node::BottomN { n, expr } => write!(f, "bottomk({n}, {expr})"),
            Node::SortDesc(expr) => write!(f, "sort_desc({expr})"),
            Node::BinaryOp(op) => op.fmt(f),
            Node::IntLiteral(value) => write!(f, "{value}"),
            Node::StringLiteral(value) => write_quoted(f, value),
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut labels: Vec<_> = self.matchers.iter().collect();
        labels.sort_by(|a, b| a.0.cmp(b.0));

        write!(f, "{}{{", self.metric)?;
        for (idx, (label, pattern)) in labels.into_iter().enumerate() {
            if idx > 0 {
                f.write_str(",")?;
            }
            write!(f, "{label}=~")?;
            write_quoted(f, pattern)?;
        }
        f.write_str("}")
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_operand(f, &self.lhs)?;
        write!(f, " {} ", self.op.as_str())?;
        if let Some(labels) = &self.on {
            write!(f, "on({}) ", labels.join(", "))?;
        }
        match &self.group {
            Some(GroupModifier::Left(labels)) => write!(f, "group_left({}) ", labels.join(", "))?,
            Some(GroupModifier::Right(labels)) => {
                write!(f, "group_right({}) ", labels.join(", "))?
            }
            None => {}
        }
        if self.return_bool {
            f.write_str("bool ")?;
        }
        write_operand(f, &self.rhs)
    }
}

// Nested binary operands keep the tree's precedence in the rendered text.
fn write_operand(f: &mut fmt::Formatter<'_>, node: &Node) -> fmt::Result {
    match node {
        Node::BinaryOp(_) => write!(f, "({node})"),
        other => fmt::Display::fmt(other, f),
    }
}

fn write_quoted(f: &mut fmt::Formatter<'_>, value: &str) -> fmt::Result {
    f.write_str("\"")?;
    for ch in value.chars() {
        match ch {
            '\\' => f.write_str("\\\\")?,
            '"' => f.write_str("\\\"")?,
            '\n' => f.write_str("\\n")?,
            other => write!(f, "{other}")?,
        }
    }
    f.write_str("\"")
}
