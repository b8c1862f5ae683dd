use crate::driver::{Locator, Readiness};

pub fn escape_selector(selector: &str) -> String {
    selector.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Expression evaluating to the first element matching `locator`, or `null`.
pub fn resolve(locator: &Locator) -> String {
    match locator {
        Locator::Css(selector) => {
            format!("document.querySelector('{}')", escape_selector(selector))
        }
        Locator::Id(id) => format!("document.getElementById('{}')", escape_selector(id)),
        Locator::XPath(expr) => format!(
            "document.evaluate('{}',document,null,XPathResult.FIRST_ORDERED_NODE_TYPE,null).singleNodeValue",
            escape_selector(expr)
        ),
    }
}

/// Expression evaluating to an array of every element matching `locator`.
pub fn resolve_all(locator: &Locator) -> String {
    match locator {
        Locator::Css(selector) => format!(
            "Array.from(document.querySelectorAll('{}'))",
            escape_selector(selector)
        ),
        Locator::Id(_) => format!("[{}].filter(Boolean)", resolve(locator)),
        Locator::XPath(expr) => format!(
            "(function(){{const r=document.evaluate('{}',document,null,XPathResult.ORDERED_NODE_SNAPSHOT_TYPE,null);const out=[];for(let i=0;i<r.snapshotLength;i++)out.push(r.snapshotItem(i));return out}})()",
            escape_selector(expr)
        ),
    }
}

pub fn readiness_check(locator: &Locator, readiness: Readiness) -> String {
    let condition = match readiness {
        Readiness::Present => "true",
        Readiness::Visible => {
            "style.display!=='none'&&style.visibility!=='hidden'&&parseFloat(style.opacity||'1')>0&&rect.width>0&&rect.height>0"
        }
        Readiness::Clickable => {
            "style.display!=='none'&&style.visibility!=='hidden'&&parseFloat(style.opacity||'1')>0&&rect.width>0&&rect.height>0&&!el.disabled&&el.getAttribute('aria-disabled')!=='true'"
        }
    };

    format!(
        r#"(function(){{const el={};if(!el)return false;const style=window.getComputedStyle(el);const rect=el.getBoundingClientRect();return {}}})()"#,
        resolve(locator),
        condition
    )
}

pub fn dispatch_click(locator: &Locator) -> String {
    format!(
        r#"(function(){{const el={};if(!el)return{{found:false}};el.click();return{{found:true}}}})()"#,
        resolve(locator)
    )
}

pub fn scroll_into_view(locator: &Locator) -> String {
    format!(
        r#"(function(){{const el={};if(!el)return{{found:false}};el.scrollIntoView({{block:'center',behavior:'instant'}});return{{found:true}}}})()"#,
        resolve(locator)
    )
}

pub fn remove_all(locator: &Locator) -> String {
    format!(
        r#"(function(){{const els={};els.forEach(e=>e.remove());return els.length}})()"#,
        resolve_all(locator)
    )
}

pub fn read_attribute(locator: &Locator, name: &str) -> String {
    format!(
        r#"(function(){{const el={};if(!el)return{{found:false,value:null}};return{{found:true,value:el.getAttribute('{}')}}}})()"#,
        resolve(locator),
        escape_selector(name)
    )
}
