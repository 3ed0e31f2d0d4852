//! Stack-trace capture over host-supplied call frames.
//!
//! The host walks its own call stack and hands each frame to
//! [`capture_stack_trace`] as a [`HostFrame`]. Capture classifies every
//! frame as skipped, a language frame, or a foreign frame, latches strict
//! mode once the first strict function is seen, optionally hides frames up
//! to a marker function, and stops at the configured limit. The recorded
//! [`StackTraceElement`]s are immutable snapshots; everything derived from
//! them (method name, type name, constructor-ness) is computed lazily from
//! the snapshot, never from live frames.

use crate::context::RealmContext;
use core_types::{SourceSection, Value};
use object_model::ObjectHeap;

/// One call frame as reported by the host's stack walker.
#[derive(Debug, Clone)]
pub struct HostFrame {
    /// Name of the executing function, possibly empty
    pub function_name: String,
    /// Source section of the call site, `None` when the host has none
    pub source: Option<SourceSection>,
    /// The `this` value of the activation
    pub receiver: Value,
    /// The function value, `None` for frames with no language function
    pub function: Option<Value>,
    /// Whether the function was declared in strict mode
    pub strict: bool,
    /// Whether the function is an engine builtin
    pub builtin: bool,
    /// Whether the frame belongs to internal bootstrap code
    pub internal: bool,
    /// Whether the frame comes from another language on the same host
    pub foreign: bool,
    /// Whether the function originates from dynamic evaluation
    pub eval: bool,
}

/// Classification of a visited frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameType {
    Skip,
    Js,
    Foreign,
}

fn classify(frame: &HostFrame) -> FrameType {
    let Some(source) = &frame.source else {
        return FrameType::Skip;
    };
    if frame.builtin {
        return FrameType::Js;
    }
    if frame.internal || !source.is_available() {
        return FrameType::Skip;
    }
    if frame.foreign {
        FrameType::Foreign
    } else {
        FrameType::Js
    }
}

/// Captures a stack trace from `frames`, outermost call last.
///
/// `skip_up_to` hides every frame until the one whose function matches the
/// marker; the marker frame itself is also dropped. Builtin apply/call
/// trampolines registered on the context are never recorded. Capture stops
/// once `options.stack_trace_limit` elements are recorded.
pub fn capture_stack_trace(
    cx: &RealmContext,
    frames: impl IntoIterator<Item = HostFrame>,
    skip_up_to: Option<core_types::ObjectId>,
) -> Vec<StackTraceElement> {
    let limit = cx.options().stack_trace_limit;
    if limit == 0 {
        return Vec::new();
    }
    let mut stack = Vec::new();
    let mut in_strict_mode = false;
    let mut skipping = skip_up_to.is_some();

    for frame in frames {
        match classify(&frame) {
            FrameType::Skip => continue,
            FrameType::Js => {
                if frame.strict {
                    in_strict_mode = true;
                }
                if let Some(function_id) = frame.function.as_ref().and_then(Value::as_object) {
                    if skipping && skip_up_to == Some(function_id) {
                        // the marker frame is dropped as well
                        skipping = false;
                        continue;
                    }
                    if cx.is_apply_or_call(function_id) {
                        continue;
                    }
                }
                if !skipping {
                    stack.push(StackTraceElement::from_js_frame(&frame, in_strict_mode));
                }
            }
            FrameType::Foreign => {
                if !skipping {
                    stack.push(StackTraceElement::from_foreign_frame(&frame, in_strict_mode));
                }
            }
        }
        if stack.len() >= limit {
            break;
        }
    }
    stack
}

/// An immutable snapshot of one recorded call frame.
#[derive(Debug, Clone, PartialEq)]
pub struct StackTraceElement {
    file_name: String,
    function_name: String,
    source: Option<SourceSection>,
    receiver: Value,
    function: Option<Value>,
    strict: bool,
    builtin: bool,
    eval: bool,
}

impl StackTraceElement {
    fn from_js_frame(frame: &HostFrame, strict: bool) -> Self {
        let file_name = frame
            .source
            .as_ref()
            .map(|s| s.file_name.clone())
            .unwrap_or_else(|| "<unknown>".to_string());
        Self {
            file_name,
            function_name: frame.function_name.clone(),
            source: frame.source.clone(),
            receiver: frame.receiver.clone(),
            function: frame.function.clone(),
            strict,
            builtin: frame.builtin,
            eval: frame.eval,
        }
    }

    fn from_foreign_frame(frame: &HostFrame, strict: bool) -> Self {
        // foreign frames carry reduced information
        let file_name = frame
            .source
            .as_ref()
            .map(|s| s.file_name.clone())
            .unwrap_or_else(|| "<unknown>".to_string());
        Self {
            file_name,
            function_name: frame.function_name.clone(),
            source: frame.source.clone(),
            receiver: Value::Undefined,
            function: None,
            strict,
            builtin: false,
            eval: false,
        }
    }

    /// File name of the frame's source.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Name the function was declared with, possibly empty.
    pub fn function_name(&self) -> &str {
        &self.function_name
    }

    /// The `this` value recorded for the frame.
    pub fn receiver(&self) -> &Value {
        &self.receiver
    }

    /// The function value recorded for the frame, if any.
    pub fn function(&self) -> Option<&Value> {
        self.function.as_ref()
    }

    /// Whether the frame executed in strict mode (directly or inherited).
    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// Whether the function originates from dynamic evaluation.
    pub fn is_eval(&self) -> bool {
        self.eval
    }

    /// 1-based line number, when location data is available.
    pub fn line_number(&self) -> Option<u32> {
        self.source.as_ref()?.position.map(|p| p.line)
    }

    /// 1-based column number, when location data is available.
    pub fn column_number(&self) -> Option<u32> {
        self.source.as_ref()?.position.map(|p| p.column)
    }

    /// Derives the method name by searching the receiver's prototype chain
    /// for a property holding the recorded function.
    ///
    /// Prefers the property matching the function's declared name
    /// (accessor prefixes stripped); otherwise the name is accepted only
    /// when it is unambiguous across the whole chain.
    pub fn method_name(&self, heap: &ObjectHeap) -> Option<String> {
        let receiver_id = self.receiver.as_object()?;
        let function = self.function.clone()?;

        let declared = self
            .function_name
            .strip_prefix("get ")
            .or_else(|| self.function_name.strip_prefix("set "))
            .unwrap_or(&self.function_name);
        if !declared.is_empty() {
            let mut current = Some(receiver_id);
            while let Some(id) = current {
                let obj = heap.get(id)?;
                if let Some(value) = obj.get_property(declared) {
                    if value == function {
                        return Some(declared.to_string());
                    }
                    break;
                }
                current = obj.prototype();
            }
        }

        let mut found = None;
        let mut current = Some(receiver_id);
        while let Some(id) = current {
            let obj = heap.get(id)?;
            for prop in obj.shape().properties() {
                if obj.get_property(&prop.name) == Some(function.clone()) {
                    match &found {
                        None => found = Some(prop.name.clone()),
                        Some(existing) if existing != &prop.name => return None,
                        Some(_) => {}
                    }
                }
            }
            current = obj.prototype();
        }
        found
    }

    /// Derives the receiver's type name from its `constructor` property.
    pub fn type_name(&self, heap: &ObjectHeap) -> Option<String> {
        let constructor = self.find_constructor(heap)?;
        let constructor_obj = heap.get(constructor.as_object()?)?;
        match constructor_obj.get_property("name") {
            Some(Value::String(name)) if !name.is_empty() => Some(name),
            _ => None,
        }
    }

    /// Whether the frame looks like a constructor call: the receiver's
    /// `constructor` property is the recorded function.
    pub fn is_constructor(&self, heap: &ObjectHeap) -> bool {
        match (self.find_constructor(heap), &self.function) {
            (Some(constructor), Some(function)) => &constructor == function,
            _ => false,
        }
    }

    fn find_constructor(&self, heap: &ObjectHeap) -> Option<Value> {
        let mut current = self.receiver.as_object();
        while let Some(id) = current {
            let obj = heap.get(id)?;
            if let Some(value) = obj.get_property("constructor") {
                return Some(value);
            }
            current = obj.prototype();
        }
        None
    }

    /// Renders the element for display:
    /// `<qualifier>.<method> (<source>:<line>:<col>)`, with `native` for
    /// builtins and `<unknown>` when location data is missing.
    pub fn format(&self, heap: &ObjectHeap) -> String {
        let type_name = self.type_name(heap);
        let mut method = correct_method_name(&self.function_name);
        if method.is_empty() {
            method = self
                .method_name(heap)
                .unwrap_or_else(|| "<anonymous>".to_string());
        }
        let include_method = type_name.is_some() || method != "<anonymous>";

        let mut out = String::new();
        if include_method {
            if let Some(type_name) = &type_name {
                if type_name == &method {
                    if self.is_constructor(heap) {
                        out.push_str("new ");
                    }
                } else {
                    out.push_str(type_name);
                    out.push('.');
                }
            }
            out.push_str(&method);
            out.push_str(" (");
        }
        if self.builtin {
            out.push_str("native");
        } else {
            match (&self.source, self.line_number(), self.column_number()) {
                (Some(source), Some(line), Some(column)) => {
                    out.push_str(&source.file_name);
                    out.push(':');
                    out.push_str(&line.to_string());
                    out.push(':');
                    out.push_str(&column.to_string());
                }
                _ => out.push_str("<unknown>"),
            }
        }
        if include_method {
            out.push(')');
        }
        out
    }
}

/// Drops internal name decorations (program/anonymous markers) from a
/// declared function name.
fn correct_method_name(name: &str) -> String {
    if name.starts_with(':') {
        String::new()
    } else {
        name.to_string()
    }
}
