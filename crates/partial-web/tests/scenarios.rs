use partial_core::{PageState, StateKey, TriggerPlan, WidgetId, locate_region};
use partial_web::{
    CallbackRequest, CheckBoxList, EventKind, ListItem, Page, PageHost, RepeatLayout, WebError,
};
use serde_json::json;

fn colors() -> [ListItem; 3] {
    [
        ListItem::new("Red", "r"),
        ListItem::new("Green", "g"),
        ListItem::new("Blue", "b"),
    ]
}

/// chk1 calls back, chk2 mirrors its selection and refreshes on every
/// callback, chk3 stays hidden until chk1 has a selection.
fn mirror_host() -> PageHost {
    PageHost::new(|coordinator| {
        let mut page = Page::new("Scenarios", coordinator);

        let chk1 = CheckBoxList::new("chk1", page.coordinator())?
            .with_items(colors())
            .with_config(|config| {
                config.auto_callback = true;
                config.causes_validation = true;
                config.validation_group = "grp".to_string();
                config.text_during_callback = "Loading...".to_string();
                config.enabled_during_callback = false;
                config.post_callback_function = "onDone".to_string();
            });
        let mut chk2 = CheckBoxList::new("chk2", page.coordinator())?.with_items(colors());
        chk2.set_auto_update_after_callback(true);
        let mut chk3 = CheckBoxList::new("chk3", page.coordinator())?
            .with_items([ListItem::new("Extra", "x")])
            .with_layout(RepeatLayout::Flow);
        chk3.set_visible(false);

        page.add_html("<h1>Colors</h1>");
        page.add(chk1)?;
        page.add(chk2)?;
        page.add(chk3)?;

        page.on_event(|controls, event| {
            if event.kind != EventKind::Callback || event.target.as_str() != "chk1" {
                return Ok(());
            }
            if let Some(chk2) = controls.get_mut("chk2") {
                chk2.apply_selection(&event.checked)?;
            }
            if !event.checked.is_empty() {
                if let Some(chk3) = controls.get_mut("chk3") {
                    chk3.set_visible(true);
                    chk3.set_update_after_callback(true);
                }
            }
            Ok(())
        });
        Ok(page)
    })
}

fn click(target: &str, checked: &[usize], state: &str) -> CallbackRequest {
    CallbackRequest {
        target: target.to_string(),
        payload: json!({ "checked": checked }),
        state: state.to_string(),
        ..CallbackRequest::default()
    }
}

#[test]
fn callback_trigger_replaces_native_postback() {
    let html = mirror_host().render().unwrap();
    assert!(html.contains(
        "PartialList_OnClick(event,true,&#39;grp&#39;,&#39;Loading...&#39;,false,null,onDone,null);"
    ));
    // chk1 is the only list with callbacks and none have AutoPostBack.
    assert_eq!(html.matches("PartialList_OnClick(event,").count(), 1);
    assert!(!html.contains("__doPostBack('"));
}

#[test]
fn auto_update_control_is_refreshed_without_being_asked() {
    let host = mirror_host();
    let first = host.callback(&click("chk1", &[0, 2], "")).unwrap();
    assert!(!first.contains("chk1"));
    assert!(first.contains("chk2"));
    assert_eq!(
        first.controls["chk2"].matches("checked=\"checked\"").count(),
        2
    );

    // The flag survives in the page state, so the next round trip behaves
    // the same.
    let saved = PageState::open(&first.state, host.state_key()).unwrap();
    let chk2 = WidgetId::new("chk2").unwrap();
    assert!(saved.get(&chk2).unwrap().auto_update_after_callback);

    let second = host.callback(&click("chk1", &[1], &first.state)).unwrap();
    assert!(second.contains("chk2"));
    assert_eq!(
        second.controls["chk2"].matches("checked=\"checked\"").count(),
        1
    );
}

#[test]
fn hidden_control_keeps_markers_and_can_be_shown_by_callback() {
    let host = mirror_host();
    let document = host.render().unwrap();
    let chk3 = WidgetId::new("chk3").unwrap();

    let region = locate_region(&document, &chk3).unwrap();
    assert_eq!(
        &document[region],
        "<span id=\"partial_chk3__\" data-partial-id=\"chk3\" data-partial-depth=\"0\"></span>"
    );

    let response = host.callback(&click("chk1", &[1], "")).unwrap();
    let fragment = &response.controls["chk3"];
    assert!(fragment.starts_with("<span id=\"partial_chk3__\""));
    assert!(fragment.contains("<span id=\"chk3\">"));
    assert!(fragment.contains("value=\"x\""));

    let updated = response.apply_to(&document);
    assert!(updated.contains("<label for=\"chk3_0\">Extra</label>"));
    assert!(updated.contains("<h1>Colors</h1>"));
    assert_eq!(updated.matches("id=\"partial_chk3__\"").count(), 1);
}

#[test]
fn empty_selection_leaves_hidden_control_alone() {
    let response = mirror_host().callback(&click("chk1", &[], "")).unwrap();
    assert!(!response.contains("chk3"));
    assert!(response.contains("chk2"));
}

#[test]
fn rendering_is_idempotent() {
    let host = mirror_host();
    assert_eq!(host.render().unwrap(), host.render().unwrap());
}

#[test]
fn callbacks_off_keeps_native_postback_trigger() {
    let host = PageHost::new(|coordinator| {
        let mut page = Page::new("Native", coordinator);
        let mut list = CheckBoxList::new("plain", page.coordinator())?.with_items(colors());
        list.set_auto_postback(true);
        page.add(list)?;
        Ok(page)
    });
    let html = host.render().unwrap();
    assert_eq!(html.matches("__doPostBack(\\&#39;plain$").count(), 3);
    assert!(!html.contains("PartialList_OnClick(event,"));
}

#[test]
fn trigger_plan_is_exclusive_per_control() {
    let coordinator = std::rc::Rc::new(partial_core::PageCoordinator::new());
    let mut list = CheckBoxList::new("chk1", coordinator)
        .unwrap()
        .with_items(colors())
        .with_config(|config| config.auto_callback = true);
    list.set_auto_postback(true);
    list.load().unwrap();
    let plan = list
        .pre_render(&partial_core::RenderContext::new())
        .unwrap()
        .clone();
    assert!(plan.is_callback());
    assert!(!list.auto_postback());
    assert_ne!(plan, TriggerPlan::Native);
}

#[test]
fn callback_for_missing_widget_is_rejected() {
    let err = mirror_host()
        .callback(&click("chk9", &[0], ""))
        .unwrap_err();
    assert!(matches!(err, WebError::UnknownTarget(ref id) if id == "chk9"));
    assert!(err.is_client_error());
}

/// chk1 calls back; chk2 is an ordinary list the user edits and that is
/// refreshed after every callback; `secret` is hidden by server code.
fn form_host() -> PageHost {
    PageHost::new(|coordinator| {
        let mut page = Page::new("Form", coordinator);
        let chk1 = CheckBoxList::new("chk1", page.coordinator())?
            .with_items(colors())
            .with_config(|config| config.auto_callback = true);
        let mut chk2 = CheckBoxList::new("chk2", page.coordinator())?.with_items(colors());
        chk2.set_auto_update_after_callback(true);
        let mut secret = CheckBoxList::new("secret", page.coordinator())?
            .with_items([ListItem::new("AdminOnly", "admin")]);
        secret.set_visible(false);
        page.add(chk1)?;
        page.add(chk2)?;
        page.add(secret)?;
        Ok(page)
    })
    .with_state_key(StateKey::new("scenario-key").unwrap())
}

fn state_field(document: &str) -> String {
    let marker = "id=\"__PARTIALSTATE\" name=\"__PARTIALSTATE\" value=\"";
    let start = document.find(marker).unwrap() + marker.len();
    let end = start + document[start..].find('"').unwrap();
    document[start..end].replace("&quot;", "\"")
}

#[test]
fn callback_keeps_selection_accepted_by_an_earlier_postback() {
    let host = form_host();
    let mut form = std::collections::HashMap::new();
    form.insert("chk2$0".to_string(), "r".to_string());
    let document = host.postback(&form).unwrap();
    assert!(document.contains("id=\"chk2_0\" name=\"chk2$0\" value=\"r\" data-index=\"0\" checked=\"checked\""));

    // No posted lists: chk2 falls back to the selection saved in state.
    let response = host
        .callback(&click("chk1", &[1], &state_field(&document)))
        .unwrap();
    let chk2 = &response.controls["chk2"];
    assert_eq!(chk2.matches("checked=\"checked\"").count(), 1);
    assert!(chk2.contains("value=\"r\" data-index=\"0\" checked=\"checked\""));
}

#[test]
fn callback_applies_lists_posted_by_the_client() {
    let host = form_host();
    let document = host.render().unwrap();
    let mut request = click("chk1", &[0], &state_field(&document));
    request.form.insert("chk1".to_string(), vec![0]);
    request.form.insert("chk2".to_string(), vec![1, 2]);
    // Hidden lists are not editable, so their posted entry is ignored.
    request.form.insert("secret".to_string(), vec![0]);

    let response = host.callback(&request).unwrap();
    let chk2 = &response.controls["chk2"];
    assert_eq!(chk2.matches("checked=\"checked\"").count(), 2);
    assert!(!chk2.contains("data-index=\"0\" checked"));

    let saved = PageState::open(&response.state, host.state_key()).unwrap();
    let secret = WidgetId::new("secret").unwrap();
    assert_eq!(saved.get(&secret).unwrap().selected, Some(vec![]));
}

#[test]
fn forged_state_cannot_reveal_a_hidden_widget() {
    let host = form_host();
    let forged = r#"{"secret":{"Visible":true,"AutoUpdateAfterCallBack":true}}"#;
    let err = host.callback(&click("chk1", &[0], forged)).unwrap_err();
    assert!(matches!(
        err,
        WebError::Core(partial_core::PartialError::TamperedState)
    ));
    assert!(err.is_client_error());

    // Re-sealing with another key does not help either.
    let mut state = PageState::new();
    state.insert(
        WidgetId::new("secret").unwrap(),
        partial_core::WidgetState {
            visible: Some(true),
            auto_update_after_callback: true,
            ..Default::default()
        },
    );
    let resealed = state.seal(&StateKey::new("guess").unwrap()).unwrap();
    assert!(host.callback(&click("chk1", &[0], &resealed)).is_err());

    let genuine = state_field(&host.render().unwrap());
    let response = host.callback(&click("chk1", &[0], &genuine)).unwrap();
    assert!(!response.contains("secret"));
}
