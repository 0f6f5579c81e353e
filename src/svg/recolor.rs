use super::Element;

/// Overwrites the `fill` of every shape below `element`, depth-first.
///
/// `element` itself is left alone; non-shape elements are descended into
/// without being touched.
pub fn recolor(element: &mut Element, color: &str) {
    for child in element.elements_mut() {
        if child.kind.is_shape() {
            child.set_attribute("fill", color);
        }
        recolor(child, color);
    }
}
