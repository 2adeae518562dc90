//! In-page helper scripts
//!
//! Scripts are sent through [`ScriptExecutor`](super::ScriptExecutor) with
//! JSON arguments. Element arguments are passed as their driver reference.

/// Paints the viewport marker in the top-left corner of the viewport.
///
/// Returns `{mask, size, offset}` describing the painted pattern in CSS
/// pixels. The block size doubles when the page is zoomed out so every block
/// stays at least one device pixel wide.
pub const ADD_PAGE_MARKER: &str = r#"
var mask = [1,0,1,1,0,1,1,0,1,0,1,0,1,1,0,1,0,0,1,1,1];
var size = window.devicePixelRatio < 1 ? 2 : 1;
var offset = size;
var marker = document.createElement('div');
marker.setAttribute('data-screenshoter-marker', 'true');
marker.style.setProperty('position', 'fixed', 'important');
marker.style.setProperty('top', '0', 'important');
marker.style.setProperty('left', '0', 'important');
marker.style.setProperty('z-index', '2147483647', 'important');
marker.style.setProperty('background', 'rgb(128,128,128)', 'important');
marker.style.setProperty('padding', offset + 'px', 'important');
marker.style.setProperty('display', 'flex', 'important');
mask.forEach(function (bit) {
  var block = document.createElement('div');
  block.style.setProperty('width', size + 'px', 'important');
  block.style.setProperty('height', size + 'px', 'important');
  block.style.setProperty('background', bit ? '#000' : '#fff', 'important');
  marker.appendChild(block);
});
document.documentElement.appendChild(marker);
return {mask: mask, size: size, offset: offset};
"#;

/// Removes the viewport marker.
pub const REMOVE_PAGE_MARKER: &str = r#"
var marker = document.querySelector('[data-screenshoter-marker]');
if (marker) marker.remove();
return null;
"#;

/// Moves an element's content with a CSS transform.
///
/// Arguments: `[element, x, y]`. Returns the applied `{x, y}`.
pub const TRANSLATE_TO: &str = r#"
var element = arguments[0], x = arguments[1], y = arguments[2];
element.style.transform = 'translate(' + -x + 'px, ' + -y + 'px)';
return {x: x, y: y};
"#;

/// Reads the offset applied by [`TRANSLATE_TO`].
///
/// Arguments: `[element]`. Returns `{x, y}`.
pub const GET_TRANSLATE: &str = r#"
var element = arguments[0];
var match = /translate\((-?[\d.]+)px,\s*(-?[\d.]+)px\)/.exec(element.style.transform || '');
return match ? {x: -Number(match[1]), y: -Number(match[2])} : {x: 0, y: 0};
"#;
