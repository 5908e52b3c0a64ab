use crate::interop::{new_obj, num, set_kv, to_js};
use js_sys::Object;
use sectormap::EditError;
use wasm_bindgen::prelude::*;

pub fn ok(v: JsValue) -> JsValue {
    let o = new_obj();
    set_kv(&o, "ok", &JsValue::from_bool(true));
    set_kv(&o, "value", &v);
    o.into()
}

pub fn err(code: &'static str, message: impl Into<String>, data: Option<JsValue>) -> JsValue {
    let root = new_obj();
    set_kv(&root, "ok", &JsValue::from_bool(false));
    let e = new_obj();
    set_kv(&e, "code", &JsValue::from_str(code));
    set_kv(&e, "message", &JsValue::from_str(&message.into()));
    if let Some(d) = data { set_kv(&e, "data", &d); }
    set_kv(&root, "error", &e.into());
    root.into()
}

#[inline]
pub fn non_finite(param: &str) -> JsValue {
    let d = new_obj(); set_kv(&d, "param", &JsValue::from_str(param));
    err("non_finite", format!("parameter '{}' must be finite", param), Some(d.into()))
}

#[inline]
pub fn invalid_id(kind: &str, id: u32) -> JsValue {
    let d = new_obj();
    set_kv(&d, "kind", &JsValue::from_str(kind));
    set_kv(&d, "id", &num(id));
    err("invalid_id", format!("invalid {} id", kind), Some(d.into()))
}

#[inline]
pub fn invalid_category(got: &str) -> JsValue {
    let d = new_obj(); set_kv(&d, "got", &JsValue::from_str(got));
    err("invalid_category", "category must be leader, enemy, treasure, bridge or decoration", Some(d.into()))
}

/// An editor refusal as an error object. The message is the status line text.
pub fn from_edit(e: &EditError) -> JsValue {
    let data: Option<JsValue> = match e {
        EditError::InvalidId { kind, id } => {
            let d = new_obj();
            set_kv(&d, "kind", &JsValue::from_str(kind));
            set_kv(&d, "id", &num(*id));
            Some(d.into())
        }
        EditError::RejectedNode(verdict) => Some(with_field("verdict", to_js(verdict))),
        EditError::ValidatorProblem(p) => Some(with_field("problem", to_js(p))),
        _ => None,
    };
    err(e.code(), e.to_string(), data)
}

fn with_field(k: &str, v: JsValue) -> JsValue {
    let d: Object = new_obj();
    set_kv(&d, k, &v);
    d.into()
}

/// `ok(f(value))` or the editor error.
pub fn wrap<T>(res: Result<T, EditError>, f: impl FnOnce(T) -> JsValue) -> JsValue {
    match res {
        Ok(v) => ok(f(v)),
        Err(e) => from_edit(&e),
    }
}
