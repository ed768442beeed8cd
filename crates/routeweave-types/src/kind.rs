//! The closed variant sets: step kinds and expression languages.
//!
//! Both are plain `Copy` enums whose wire names are the camelCase keys used by
//! the routing DSL. Per-kind behavior (category, shorthand field, expression
//! support) is decided by `match` here; per-kind child slots are data and live
//! in the metadata catalog instead.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::RouteweaveError;

/// Generates an enum with a fixed wire name per variant, plus the name table
/// conversions and serde support through those names.
macro_rules! named_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident { $($variant:ident => $wire:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        $vis enum $name {
            $($variant),+
        }

        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// The wire name of this variant.
            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $wire),+
                }
            }

            fn lookup(name: &str) -> Option<Self> {
                match name {
                    $($wire => Some($name::$variant),)+
                    _ => None,
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.as_str().to_string()
            }
        }

        impl TryFrom<String> for $name {
            type Error = RouteweaveError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.parse()
            }
        }
    };
}

named_enum! {
    /// A step node variant.
    ///
    /// `Opaque` stands in for any discriminant the engine does not know; it is
    /// never produced by name lookup.
    pub enum StepKind {
        // Top-level flows
        Route => "route",
        RouteTemplate => "routeTemplate",
        TemplatedRoute => "templatedRoute",
        RouteConfiguration => "routeConfiguration",
        Rest => "rest",
        RestConfiguration => "restConfiguration",
        Beans => "beans",
        ErrorHandler => "errorHandler",
        Intercept => "intercept",
        InterceptFrom => "interceptFrom",
        InterceptSendToEndpoint => "interceptSendToEndpoint",
        OnCompletion => "onCompletion",
        OnException => "onException",
        From => "from",
        // REST verbs
        Get => "get",
        Post => "post",
        Put => "put",
        Delete => "delete",
        Patch => "patch",
        Head => "head",
        // Branches
        When => "when",
        Otherwise => "otherwise",
        DoCatch => "doCatch",
        DoFinally => "doFinally",
        OnFallback => "onFallback",
        // Endpoints
        To => "to",
        ToD => "toD",
        WireTap => "wireTap",
        Enrich => "enrich",
        PollEnrich => "pollEnrich",
        Poll => "poll",
        // Grouping
        Step => "step",
        // Processors
        Aggregate => "aggregate",
        Bean => "bean",
        Choice => "choice",
        CircuitBreaker => "circuitBreaker",
        ClaimCheck => "claimCheck",
        ConvertBodyTo => "convertBodyTo",
        Delay => "delay",
        DoTry => "doTry",
        DynamicRouter => "dynamicRouter",
        Filter => "filter",
        IdempotentConsumer => "idempotentConsumer",
        Kamelet => "kamelet",
        LoadBalance => "loadBalance",
        Log => "log",
        Loop => "loop",
        Marshal => "marshal",
        Multicast => "multicast",
        Pipeline => "pipeline",
        Process => "process",
        RecipientList => "recipientList",
        RemoveHeader => "removeHeader",
        RemoveHeaders => "removeHeaders",
        RemoveProperty => "removeProperty",
        RemoveProperties => "removeProperties",
        Resequence => "resequence",
        Rollback => "rollback",
        RoutingSlip => "routingSlip",
        Saga => "saga",
        Sample => "sample",
        Script => "script",
        SetBody => "setBody",
        SetHeader => "setHeader",
        SetProperty => "setProperty",
        Sort => "sort",
        Split => "split",
        Stop => "stop",
        Threads => "threads",
        Throttle => "throttle",
        ThrowException => "throwException",
        Transacted => "transacted",
        Transform => "transform",
        Unmarshal => "unmarshal",
        Validate => "validate",
        Opaque => "opaque",
    }
}

/// Coarse grouping of step kinds, used to derive the structural predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepCategory {
    /// May appear as a top-level flow in a document.
    Flow,
    /// The entry endpoint of a route; also allowed as a top-level flow.
    Entry,
    /// A REST operation inside a `rest` definition.
    RestVerb,
    /// A branch of a compound processor (choice, doTry, circuitBreaker).
    Branch,
    /// Sends to or reads from a connector URI.
    Endpoint,
    /// Groups a sequence of steps under one collapsible node.
    Group,
    /// Any other processing step.
    Processor,
    /// An unknown kind carried through untouched.
    Opaque,
}

impl StepKind {
    /// Resolve a wire name to a known kind. Never returns `Opaque`.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::lookup(name).filter(|kind| *kind != StepKind::Opaque)
    }

    pub fn category(self) -> StepCategory {
        use StepKind::*;
        match self {
            Route | RouteTemplate | TemplatedRoute | RouteConfiguration | Rest
            | RestConfiguration | Beans | ErrorHandler | Intercept | InterceptFrom
            | InterceptSendToEndpoint | OnCompletion | OnException => StepCategory::Flow,
            From => StepCategory::Entry,
            Get | Post | Put | Delete | Patch | Head => StepCategory::RestVerb,
            When | Otherwise | DoCatch | DoFinally | OnFallback => StepCategory::Branch,
            To | ToD | WireTap | Enrich | PollEnrich | Poll => StepCategory::Endpoint,
            Step => StepCategory::Group,
            Aggregate | Bean | Choice | CircuitBreaker | ClaimCheck | ConvertBodyTo | Delay
            | DoTry | DynamicRouter | Filter | IdempotentConsumer | Kamelet | LoadBalance
            | Log | Loop | Marshal | Multicast | Pipeline | Process | RecipientList
            | RemoveHeader | RemoveHeaders | RemoveProperty | RemoveProperties | Resequence
            | Rollback | RoutingSlip | Saga | Sample | Script | SetBody | SetHeader
            | SetProperty | Sort | Split | Stop | Threads | Throttle | ThrowException
            | Transacted | Transform | Unmarshal | Validate => StepCategory::Processor,
            Opaque => StepCategory::Opaque,
        }
    }

    /// Whether nodes of this kind may sit directly in a document's flow list.
    pub fn is_flow(self) -> bool {
        matches!(self.category(), StepCategory::Flow | StepCategory::Entry)
    }

    /// Whether nodes of this kind carry a connector URI.
    pub fn is_endpoint(self) -> bool {
        matches!(self.category(), StepCategory::Entry | StepCategory::Endpoint)
    }

    /// The two flavors of a choice branch.
    pub fn is_conditional_branch(self) -> bool {
        matches!(self, StepKind::When | StepKind::Otherwise)
    }

    pub fn is_step_group(self) -> bool {
        self.category() == StepCategory::Group
    }

    /// The field a bare scalar is wrapped into, e.g. `to: "log:x"` becomes
    /// `to: { uri: "log:x" }`.
    pub fn shorthand_field(self) -> Option<&'static str> {
        use StepKind::*;
        match self {
            From | To | ToD | WireTap | Poll => Some("uri"),
            Log | Rollback => Some("message"),
            ConvertBodyTo => Some("type"),
            RemoveHeader | RemoveProperty | Kamelet => Some("name"),
            RemoveHeaders | RemoveProperties => Some("pattern"),
            Process | Transacted => Some("ref"),
            Sample => Some("samplePeriod"),
            Get | Post | Put | Delete | Patch | Head => Some("path"),
            _ => None,
        }
    }

    /// The field a sequence body is held in, e.g. `beans: [ ... ]` keeps its
    /// list under `fields["beans"]`.
    pub fn list_field(self) -> Option<&'static str> {
        match self {
            StepKind::Beans => Some("beans"),
            _ => None,
        }
    }

    /// Whether the kind owns an expression (predicate or value producer).
    pub fn is_expression_bearing(self) -> bool {
        use StepKind::*;
        matches!(
            self,
            Filter
                | When
                | Split
                | SetBody
                | SetHeader
                | SetProperty
                | Transform
                | Delay
                | Loop
                | Validate
                | RecipientList
                | RoutingSlip
                | DynamicRouter
                | Script
                | Sort
                | Throttle
                | IdempotentConsumer
                | Resequence
        )
    }
}

impl FromStr for StepKind {
    type Err = RouteweaveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StepKind::from_name(s).ok_or_else(|| RouteweaveError::UnknownKind { kind: s.to_string() })
    }
}

named_enum! {
    /// An expression variant: the language an expression body is written in.
    pub enum ExpressionLanguage {
        Simple => "simple",
        Constant => "constant",
        Header => "header",
        ExchangeProperty => "exchangeProperty",
        Variable => "variable",
        JsonPath => "jsonpath",
        XPath => "xpath",
        XQuery => "xquery",
        Jq => "jq",
        Groovy => "groovy",
        JavaScript => "js",
        Java => "java",
        Python => "python",
        Method => "method",
        Mvel => "mvel",
        Ognl => "ognl",
        Ref => "ref",
        Spel => "spel",
        Tokenize => "tokenize",
        Csimple => "csimple",
        Datasonnet => "datasonnet",
        Wasm => "wasm",
    }
}

impl ExpressionLanguage {
    pub fn from_name(name: &str) -> Option<Self> {
        Self::lookup(name)
    }
}

impl FromStr for ExpressionLanguage {
    type Err = RouteweaveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ExpressionLanguage::from_name(s).ok_or_else(|| RouteweaveError::Other(format!(
            "Unknown expression language '{s}'"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_kind_round_trips_through_its_name() {
        for kind in StepKind::ALL.iter().copied().filter(|k| *k != StepKind::Opaque) {
            assert_eq!(StepKind::from_name(kind.as_str()), Some(kind), "kind {kind}");
        }
    }

    #[test]
    fn opaque_is_never_resolved_by_name() {
        assert_eq!(StepKind::from_name("opaque"), None);
        assert!("opaque".parse::<StepKind>().is_err());
    }

    #[test]
    fn unknown_name_is_unknown_kind_error() {
        let err = "teleport".parse::<StepKind>().unwrap_err();
        assert!(matches!(err, RouteweaveError::UnknownKind { ref kind } if kind == "teleport"));
    }

    #[test]
    fn flows_and_endpoints() {
        assert!(StepKind::Route.is_flow());
        assert!(StepKind::From.is_flow());
        assert!(StepKind::From.is_endpoint());
        assert!(StepKind::ToD.is_endpoint());
        assert!(!StepKind::Log.is_flow());
        assert!(!StepKind::Log.is_endpoint());
    }

    #[test]
    fn branches_and_groups() {
        assert!(StepKind::When.is_conditional_branch());
        assert!(StepKind::Otherwise.is_conditional_branch());
        assert!(!StepKind::DoCatch.is_conditional_branch());
        assert!(StepKind::Step.is_step_group());
        assert!(!StepKind::Pipeline.is_step_group());
    }

    #[test]
    fn shorthand_fields() {
        assert_eq!(StepKind::To.shorthand_field(), Some("uri"));
        assert_eq!(StepKind::Log.shorthand_field(), Some("message"));
        assert_eq!(StepKind::Choice.shorthand_field(), None);
        assert_eq!(StepKind::Beans.list_field(), Some("beans"));
        assert_eq!(StepKind::Route.list_field(), None);
    }

    #[test]
    fn kind_serializes_as_wire_name() {
        assert_eq!(serde_json::to_string(&StepKind::ToD).unwrap(), "\"toD\"");
        let kind: StepKind = serde_json::from_str("\"routeConfiguration\"").unwrap();
        assert_eq!(kind, StepKind::RouteConfiguration);
        assert!(serde_json::from_str::<StepKind>("\"teleport\"").is_err());
    }

    #[test]
    fn expression_languages_resolve() {
        assert_eq!(ExpressionLanguage::from_name("jsonpath"), Some(ExpressionLanguage::JsonPath));
        assert_eq!(ExpressionLanguage::from_name("expression"), None);
        assert_eq!(ExpressionLanguage::JavaScript.to_string(), "js");
    }
}
