//! Return types of well-known globals and methods.
//!
//! Only entries whose type does not depend on arguments or receiver
//! generics live in the static tables; the few receiver-dependent array and
//! string methods are handled by [`receiver_method`]. Method tables are keyed
//! by the built-in a receiver resolved to, never by the method name alone: a
//! user type may well have its own `push` or `has`.

use anatomist::{InferredType, Primitive};

const NUMBER_FUNCTIONS: &[&str] = &["Number", "parseInt", "parseFloat"];

const STRING_FUNCTIONS: &[&str] = &[
    "String",
    "encodeURIComponent",
    "decodeURIComponent",
    "encodeURI",
    "decodeURI",
    "btoa",
    "atob",
];

const BOOLEAN_FUNCTIONS: &[&str] = &["Boolean", "isNaN", "isFinite"];

/// Classes constructed by name with no generic parameters.
const PLAIN_CLASSES: &[&str] = &[
    "Date",
    "RegExp",
    "Error",
    "TypeError",
    "RangeError",
    "SyntaxError",
    "ReferenceError",
    "EvalError",
    "URIError",
    "AggregateError",
    "URL",
    "URLSearchParams",
    "AbortController",
    "Headers",
    "Request",
    "Response",
    "FormData",
    "Blob",
    "TextEncoder",
    "TextDecoder",
    "EventTarget",
    "ArrayBuffer",
    "DataView",
    "Uint8Array",
    "Int8Array",
    "Uint16Array",
    "Int16Array",
    "Uint32Array",
    "Int32Array",
    "Float32Array",
    "Float64Array",
    "Object",
    "String",
    "Number",
    "Boolean",
];

/// Return type of a call to a global function: `parseInt(x)`.
pub fn global_function(name: &str) -> Option<InferredType> {
    if NUMBER_FUNCTIONS.contains(&name) {
        return Some(InferredType::number());
    }
    if STRING_FUNCTIONS.contains(&name) {
        return Some(InferredType::string());
    }
    if BOOLEAN_FUNCTIONS.contains(&name) {
        return Some(InferredType::boolean());
    }
    match name {
        "BigInt" => Some(InferredType::Primitive(Primitive::BigInt)),
        "Symbol" => Some(InferredType::Primitive(Primitive::Symbol)),
        // `Date()` called without `new` returns a string.
        "Date" => Some(InferredType::string()),
        "fetch" => Some(InferredType::promise(InferredType::named("Response"))),
        "require" => Some(InferredType::Any),
        _ => None,
    }
}

/// Return type of `Namespace.member(…)` on a global namespace object.
///
/// `Promise.resolve` depends on its argument and is handled by the caller.
pub fn global_call(object: &str, property: &str) -> Option<InferredType> {
    match (object, property) {
        ("JSON", "parse") => Some(InferredType::Any),
        ("JSON", "stringify") => Some(InferredType::string()),
        ("Math", _) => Some(InferredType::number()),
        ("Object", "keys") => Some(InferredType::array(InferredType::string())),
        ("Object", "is") => Some(InferredType::boolean()),
        ("Array", "isArray") => Some(InferredType::boolean()),
        ("Date", "now" | "parse" | "UTC") => Some(InferredType::number()),
        ("Number", "isInteger" | "isFinite" | "isNaN" | "isSafeInteger") => {
            Some(InferredType::boolean())
        }
        ("Number", "parseInt" | "parseFloat") => Some(InferredType::number()),
        ("String", "fromCharCode" | "fromCodePoint" | "raw") => Some(InferredType::string()),
        ("Symbol", "for") => Some(InferredType::Primitive(Primitive::Symbol)),
        ("Reflect", "has") => Some(InferredType::boolean()),
        ("performance", "now") => Some(InferredType::number()),
        ("console", _) => Some(InferredType::Void),
        _ => None,
    }
}

/// Type of a bare global value: `NaN`, `Infinity`.
pub fn global_value(name: &str) -> Option<InferredType> {
    match name {
        "NaN" | "Infinity" => Some(InferredType::number()),
        "undefined" => Some(InferredType::Undefined),
        _ => None,
    }
}

/// Instance type of `new Name<args>()` for built-in classes.
pub fn constructed(name: &str, args: Vec<InferredType>) -> Option<InferredType> {
    let defaults = |count: usize, args: Vec<InferredType>| {
        if args.is_empty() {
            vec![InferredType::Any; count]
        } else {
            args
        }
    };
    match name {
        "Map" | "WeakMap" => Some(InferredType::Named {
            name: name.to_string(),
            args: defaults(2, args),
        }),
        "Set" | "WeakSet" => Some(InferredType::Named {
            name: name.to_string(),
            args: defaults(1, args),
        }),
        "Array" => Some(InferredType::array(
            args.into_iter().next().unwrap_or(InferredType::Any),
        )),
        "Promise" => Some(InferredType::promise(
            args.into_iter().next().unwrap_or(InferredType::Unknown),
        )),
        _ if PLAIN_CLASSES.contains(&name) => Some(InferredType::named(name)),
        _ => None,
    }
}

/// The built-in a method receiver resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Receiver {
    String,
    Number,
    Boolean,
    Array,
    Date,
    RegExp,
    Map,
    Set,
}

impl Receiver {
    /// `None` for anything that is not plainly one of the built-ins.
    pub fn of(ty: &InferredType) -> Option<Self> {
        match ty {
            InferredType::Primitive(Primitive::String) => Some(Receiver::String),
            InferredType::Primitive(Primitive::Number) => Some(Receiver::Number),
            InferredType::Primitive(Primitive::Boolean) => Some(Receiver::Boolean),
            InferredType::Array(_) | InferredType::Tuple { .. } => Some(Receiver::Array),
            InferredType::Named { name, .. } => Self::by_name(name),
            // Declared annotations such as `Map<string, number>` stay text.
            InferredType::Text(text) if !text.contains(['|', '&']) => {
                let base = text.split('<').next().unwrap_or_default();
                if base.len() == text.len() || text.ends_with('>') {
                    Self::by_name(base.trim())
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    fn by_name(name: &str) -> Option<Self> {
        match name {
            "Date" => Some(Receiver::Date),
            "RegExp" => Some(Receiver::RegExp),
            "Map" | "ReadonlyMap" | "WeakMap" => Some(Receiver::Map),
            "Set" | "ReadonlySet" | "WeakSet" => Some(Receiver::Set),
            "Array" | "ReadonlyArray" => Some(Receiver::Array),
            _ => None,
        }
    }
}

/// Return type of `receiver.method(…)` for a built-in receiver, when it
/// does not depend on the receiver's element type.
pub fn method(name: &str, receiver: Receiver) -> Option<InferredType> {
    let string = InferredType::string;
    let number = InferredType::number;
    let boolean = InferredType::boolean;
    if matches!(name, "hasOwnProperty" | "isPrototypeOf" | "propertyIsEnumerable") {
        return Some(boolean());
    }
    match receiver {
        Receiver::String => match name {
            "toString" | "valueOf" | "toUpperCase" | "toLowerCase" | "toLocaleUpperCase"
            | "toLocaleLowerCase" | "trim" | "trimStart" | "trimEnd" | "padStart" | "padEnd"
            | "charAt" | "substring" | "substr" | "replace" | "replaceAll" | "repeat"
            | "normalize" => Some(string()),
            "indexOf" | "lastIndexOf" | "charCodeAt" | "localeCompare" | "search" => Some(number()),
            "includes" | "startsWith" | "endsWith" => Some(boolean()),
            "split" => Some(InferredType::array(string())),
            "match" => Some(InferredType::Text("RegExpMatchArray | null".into())),
            _ => None,
        },
        Receiver::Number => match name {
            "toString" | "toFixed" | "toPrecision" | "toExponential" | "toLocaleString" => {
                Some(string())
            }
            "valueOf" => Some(number()),
            _ => None,
        },
        Receiver::Boolean => match name {
            "toString" => Some(string()),
            "valueOf" => Some(boolean()),
            _ => None,
        },
        Receiver::Array => match name {
            "join" | "toString" | "toLocaleString" => Some(string()),
            "indexOf" | "lastIndexOf" | "push" | "unshift" | "findIndex" | "findLastIndex" => {
                Some(number())
            }
            "includes" | "some" | "every" => Some(boolean()),
            "forEach" => Some(InferredType::Void),
            _ => None,
        },
        Receiver::Date => match name {
            "toString" | "toISOString" | "toUTCString" | "toDateString" | "toTimeString"
            | "toJSON" | "toLocaleString" | "toLocaleDateString" | "toLocaleTimeString" => {
                Some(string())
            }
            "valueOf" => Some(number()),
            _ if name.starts_with("get") || name.starts_with("set") => Some(number()),
            _ => None,
        },
        Receiver::RegExp => match name {
            "test" => Some(boolean()),
            "toString" => Some(string()),
            _ => None,
        },
        Receiver::Map | Receiver::Set => match name {
            "has" | "delete" => Some(boolean()),
            "clear" | "forEach" => Some(InferredType::Void),
            _ => None,
        },
    }
}

/// Methods whose result follows the receiver: `T[]` and `string`.
pub fn receiver_method(name: &str, receiver: &InferredType) -> Option<InferredType> {
    let element_or_undefined =
        |element: &InferredType| InferredType::union([element.clone(), InferredType::Undefined]);
    match receiver {
        InferredType::Array(element) => match name {
            "filter" | "slice" | "concat" | "reverse" | "sort" | "toSorted" | "toReversed"
            | "splice" => Some(receiver.clone()),
            "find" | "findLast" | "pop" | "shift" | "at" => Some(element_or_undefined(element)),
            _ => None,
        },
        InferredType::Primitive(Primitive::String) => match name {
            "slice" | "concat" => Some(InferredType::string()),
            "at" => Some(element_or_undefined(&InferredType::string())),
            _ => None,
        },
        _ => None,
    }
}
