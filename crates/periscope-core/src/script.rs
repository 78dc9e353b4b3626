//! Client-side interception script.
//!
//! Rewriting the document catches the URLs present at fetch time; anything
//! a page script builds later escapes the server-side passes. The script
//! injected before `</body>` closes that gap in the browser: it wraps the
//! navigation and network entry points and re-routes their targets through
//! the proxy endpoint, using the same exclusion rules as the server.
//!
//! Function wrapping is generated from [`HOOKED_FUNCTIONS`], a table of
//! (owner, function, URL argument slot) rows expanded into calls to one
//! generic `hook` helper. `fetch` takes a dedicated wrapper since its
//! argument may be a `Request` object rather than a string.

use crate::codec::RewriteContext;
use crate::LINK_MARKER;

/// Functions wrapped in the browser, with the argument slot holding the URL.
const HOOKED_FUNCTIONS: &[(&str, &str, usize)] = &[
    ("window", "open", 0),
    ("window.location", "assign", 0),
    ("window.location", "replace", 0),
    ("XMLHttpRequest.prototype", "open", 1),
];

const SCRIPT_TEMPLATE: &str = r##"(function () {
  if (window.__periscopeHooks) return;
  window.__periscopeHooks = true;

  var MARKER = "{{MARKER}}";
  var BASE = "{{BASE}}";
  var SKIP = ["#", "javascript:", "data:", "mailto:", "tel:", "blob:"];

  function route(value) {
    if (value === null || value === undefined) return value;
    var reference = String(value);
    if (reference === "" || reference.indexOf(MARKER) !== -1) return reference;
    for (var i = 0; i < SKIP.length; i++) {
      if (reference.toLowerCase().indexOf(SKIP[i]) === 0) return reference;
    }
    try {
      return MARKER + encodeURIComponent(new URL(reference, BASE).href);
    } catch (err) {
      return reference;
    }
  }

  function hook(owner, name, slot) {
    var original = owner[name];
    if (typeof original !== "function") return;
    owner[name] = function () {
      var args = Array.prototype.slice.call(arguments);
      if (args.length > slot) args[slot] = route(args[slot]);
      return original.apply(this, args);
    };
  }

{{HOOKS}}

  if (typeof window.fetch === "function") {
    var originalFetch = window.fetch;
    window.fetch = function (input, init) {
      if (typeof input === "string") {
        return originalFetch.call(window, route(input), init);
      }
      if (input && typeof input.url === "string") {
        return originalFetch.call(window, new Request(route(input.url), input), init);
      }
      return originalFetch.call(window, input, init);
    };
  }

  document.addEventListener("click", function (event) {
    var node = event.target;
    while (node && node.tagName !== "A") node = node.parentElement;
    if (!node) return;
    var href = node.getAttribute("href");
    if (!href || href.charAt(0) === "#") return;
    var routed = route(href);
    if (routed === href) return;
    event.preventDefault();
    window.location.href = routed;
  }, true);

  document.addEventListener("submit", function (event) {
    var form = event.target;
    if (!form || form.tagName !== "FORM") return;
    event.preventDefault();
    var action = form.getAttribute("action") || "";
    var marked = action.indexOf(MARKER);
    if (marked !== -1) {
      action = decodeURIComponent(action.slice(marked + MARKER.length));
    }
    var destination;
    try {
      destination = new URL(action || BASE, BASE).href;
    } catch (err) {
      return;
    }
    var query = new URLSearchParams(new FormData(form)).toString();
    if (query) {
      destination += (destination.indexOf("?") === -1 ? "?" : "&") + query;
    }
    window.location.href = MARKER + encodeURIComponent(destination);
  }, true);
})();
"##;

/// Renders the interception script for a page served from `ctx`'s base URL.
///
/// The result is raw JavaScript; the HTML transformer wraps it in a
/// `<script>` element when injecting.
pub fn interception_script(ctx: &RewriteContext) -> String {
    let hooks = HOOKED_FUNCTIONS
        .iter()
        .map(|(owner, name, slot)| format!("  hook({owner}, \"{name}\", {slot});"))
        .collect::<Vec<_>>()
        .join("\n");

    SCRIPT_TEMPLATE
        .replace("{{HOOKS}}", &hooks)
        .replace("{{MARKER}}", LINK_MARKER)
        .replace("{{BASE}}", &js_string_escape(ctx.base().as_str()))
}

/// Escapes a value for embedding inside a double-quoted JS string literal.
fn js_string_escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
