mod test_self_filter;
