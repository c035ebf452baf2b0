//! 轻量模板渲染：占位符形如 `{name}`，只替换调用方提供的变量

/// 用给定变量渲染模板，未提供的占位符原样保留
///
/// 从左到右只扫描一遍模板，已插入的变量值不会再被当作占位符解析
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut rendered = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        rendered.push_str(&rest[..start]);
        let after = &rest[start + 1..];

        let substitution = after.find('}').and_then(|end| {
            let name = &after[..end];
            vars.iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| (*value, end))
        });

        match substitution {
            Some((value, end)) => {
                rendered.push_str(value);
                rest = &after[end + 1..];
            }
            None => {
                rendered.push('{');
                rest = after;
            }
        }
    }

    rendered.push_str(rest);
    rendered
}

/// 返回模板中缺失的必需占位符
pub fn missing_placeholders<'a>(template: &str, required: &[&'a str]) -> Vec<&'a str> {
    required
        .iter()
        .filter(|name| !template.contains(&format!("{{{}}}", name)))
        .copied()
        .collect()
}
