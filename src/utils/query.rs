/// 清理用户输入的查询：去掉控制字符与首尾空白，并按字符数截断
pub fn sanitize_query(query: &str, max_length: usize) -> String {
    let cleaned: String = query.chars().filter(|c| !c.is_control()).collect();
    cleaned.trim().chars().take(max_length).collect()
}
