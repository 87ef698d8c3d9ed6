pub fn den_members_key(den_id: &str) -> String {
    format!("den_members:{}", den_id)
}
