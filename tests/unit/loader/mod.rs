mod test_spreadsheet;
