#![no_main]

use libfuzzer_sys::fuzz_target;
use tunedrop::automation::UiTree;

fuzz_target!(|data: &[u8]| {
    let Ok(xml) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(tree) = UiTree::from_uiautomator_xml(xml) else {
        return;
    };

    for id in tree.preorder() {
        assert!(tree.depth(id) < tree.len());
        assert_eq!(tree.ancestors(id).next(), Some(id));
        let _ = tree[id].summary();
    }
    let _ = tree.find_by_text("share");
    let _ = tree.screen_bounds().center();
});
